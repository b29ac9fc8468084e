//! Notification destinations.
//!
//! Stored as `{"type": "<t>", "name": ..., "<t>": {<config>}}`; the `type`
//! field selects which config object is read.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use vigil_types::{Readable, StreamError, StreamInput, StreamOutput, User, WireEnum, Writeable};

/// Kind of notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Chime,
    Slack,
    CustomWebhook,
    Email,
    Sns,
    TestAction,
}

impl DestinationType {
    pub const ALL: [DestinationType; 6] = [
        Self::Chime,
        Self::Slack,
        Self::CustomWebhook,
        Self::Email,
        Self::Sns,
        Self::TestAction,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chime => "chime",
            Self::Slack => "slack",
            Self::CustomWebhook => "custom_webhook",
            Self::Email => "email",
            Self::Sns => "sns",
            Self::TestAction => "test_action",
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::Validation(format!("unknown destination type: {s}")))
    }
}

impl WireEnum for DestinationType {
    const NAME: &'static str = "DestinationType";

    fn ordinal(self) -> u8 {
        match self {
            Self::Chime => 0,
            Self::Slack => 1,
            Self::CustomWebhook => 2,
            Self::Email => 3,
            Self::Sns => 4,
            Self::TestAction => 5,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chime {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slack {
    pub url: String,
}

/// Arbitrary HTTP endpoint; either a full `url` or `host` (+ port/path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomWebhook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub header_params: BTreeMap<String, String>,
}

fn default_port() -> i32 {
    -1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub email_account_id: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sns {
    pub topic_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

/// Channel-specific settings; the variant determines the destination type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationConfig {
    Chime(Chime),
    Slack(Slack),
    CustomWebhook(CustomWebhook),
    Email(Email),
    Sns(Sns),
    TestAction,
}

impl DestinationConfig {
    #[must_use]
    pub fn destination_type(&self) -> DestinationType {
        match self {
            Self::Chime(_) => DestinationType::Chime,
            Self::Slack(_) => DestinationType::Slack,
            Self::CustomWebhook(_) => DestinationType::CustomWebhook,
            Self::Email(_) => DestinationType::Email,
            Self::Sns(_) => DestinationType::Sns,
            Self::TestAction => DestinationType::TestAction,
        }
    }
}

/// A notification destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DestinationDoc", into = "DestinationDoc")]
pub struct Destination {
    pub name: String,
    pub schema_version: i32,
    pub user: Option<User>,
    pub last_update_time: Option<i64>,
    pub config: DestinationConfig,
}

impl Destination {
    pub fn new(name: impl Into<String>, config: DestinationConfig) -> Self {
        Self {
            name: name.into(),
            schema_version: 0,
            user: None,
            last_update_time: None,
            config,
        }
    }

    #[must_use]
    pub fn destination_type(&self) -> DestinationType {
        self.config.destination_type()
    }

    /// Checks the fields a destination cannot be stored without.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Validation("Destination name must not be empty".into()));
        }
        match &self.config {
            DestinationConfig::Chime(Chime { url }) | DestinationConfig::Slack(Slack { url }) => {
                if url.trim().is_empty() {
                    return Err(ModelError::Validation(format!(
                        "{} url must not be empty",
                        self.destination_type()
                    )));
                }
            }
            DestinationConfig::CustomWebhook(webhook) => {
                let has_url = webhook.url.as_deref().is_some_and(|u| !u.trim().is_empty());
                let has_host = webhook.host.as_deref().is_some_and(|h| !h.trim().is_empty());
                if !has_url && !has_host {
                    return Err(ModelError::Validation(
                        "custom_webhook requires a url or a host".into(),
                    ));
                }
            }
            DestinationConfig::Email(email) => {
                if email.email_account_id.trim().is_empty() {
                    return Err(ModelError::Validation("email_account_id must not be empty".into()));
                }
                if email.recipients.is_empty() {
                    return Err(ModelError::Validation("email requires at least one recipient".into()));
                }
            }
            DestinationConfig::Sns(sns) => {
                if sns.topic_arn.trim().is_empty() {
                    return Err(ModelError::Validation("sns topic_arn must not be empty".into()));
                }
            }
            DestinationConfig::TestAction => {}
        }
        Ok(())
    }
}

/// Stored JSON shape of a destination.
#[derive(Serialize, Deserialize)]
struct DestinationDoc {
    #[serde(rename = "type")]
    destination_type: DestinationType,
    name: String,
    #[serde(default)]
    schema_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_update_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chime: Option<Chime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slack: Option<Slack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_webhook: Option<CustomWebhook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sns: Option<Sns>,
}

impl TryFrom<DestinationDoc> for Destination {
    type Error = String;

    fn try_from(doc: DestinationDoc) -> Result<Self, Self::Error> {
        let missing = || format!("{} destination is missing its configuration", doc.destination_type);
        let config = match doc.destination_type {
            DestinationType::Chime => DestinationConfig::Chime(doc.chime.clone().ok_or_else(missing)?),
            DestinationType::Slack => DestinationConfig::Slack(doc.slack.clone().ok_or_else(missing)?),
            DestinationType::CustomWebhook => {
                DestinationConfig::CustomWebhook(doc.custom_webhook.clone().ok_or_else(missing)?)
            }
            DestinationType::Email => DestinationConfig::Email(doc.email.clone().ok_or_else(missing)?),
            DestinationType::Sns => DestinationConfig::Sns(doc.sns.clone().ok_or_else(missing)?),
            DestinationType::TestAction => DestinationConfig::TestAction,
        };
        Ok(Self {
            name: doc.name,
            schema_version: doc.schema_version,
            user: doc.user,
            last_update_time: doc.last_update_time,
            config,
        })
    }
}

impl From<Destination> for DestinationDoc {
    fn from(dest: Destination) -> Self {
        let mut doc = DestinationDoc {
            destination_type: dest.destination_type(),
            name: dest.name,
            schema_version: dest.schema_version,
            user: dest.user,
            last_update_time: dest.last_update_time,
            chime: None,
            slack: None,
            custom_webhook: None,
            email: None,
            sns: None,
        };
        match dest.config {
            DestinationConfig::Chime(c) => doc.chime = Some(c),
            DestinationConfig::Slack(s) => doc.slack = Some(s),
            DestinationConfig::CustomWebhook(w) => doc.custom_webhook = Some(w),
            DestinationConfig::Email(e) => doc.email = Some(e),
            DestinationConfig::Sns(s) => doc.sns = Some(s),
            DestinationConfig::TestAction => {}
        }
        doc
    }
}

fn write_string_map(out: &mut StreamOutput, map: &BTreeMap<String, String>) {
    out.write_u32(u32::try_from(map.len()).unwrap_or(u32::MAX));
    for (key, value) in map {
        out.write_string(key);
        out.write_string(value);
    }
}

fn read_string_map(input: &mut StreamInput<'_>) -> Result<BTreeMap<String, String>, StreamError> {
    let count = input.read_u32()?;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = input.read_string()?;
        let value = input.read_string()?;
        map.insert(key, value);
    }
    Ok(map)
}

impl Writeable for Destination {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(&self.name);
        out.write_i32(self.schema_version);
        out.write_optional(self.user.as_ref());
        out.write_optional_i64(self.last_update_time);
        out.write_enum(self.destination_type());
        match &self.config {
            DestinationConfig::Chime(Chime { url }) | DestinationConfig::Slack(Slack { url }) => {
                out.write_string(url);
            }
            DestinationConfig::CustomWebhook(w) => {
                out.write_optional_string(w.url.as_deref());
                out.write_optional_string(w.host.as_deref());
                out.write_i32(w.port);
                out.write_optional_string(w.path.as_deref());
                write_string_map(out, &w.query_params);
                write_string_map(out, &w.header_params);
            }
            DestinationConfig::Email(e) => {
                out.write_string(&e.email_account_id);
                out.write_string_list(&e.recipients);
            }
            DestinationConfig::Sns(s) => {
                out.write_string(&s.topic_arn);
                out.write_optional_string(s.role_arn.as_deref());
            }
            DestinationConfig::TestAction => {}
        }
    }
}

impl Readable for Destination {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        let name = input.read_string()?;
        let schema_version = input.read_i32()?;
        let user = input.read_optional::<User>()?;
        let last_update_time = input.read_optional_i64()?;
        let config = match input.read_enum::<DestinationType>()? {
            DestinationType::Chime => DestinationConfig::Chime(Chime { url: input.read_string()? }),
            DestinationType::Slack => DestinationConfig::Slack(Slack { url: input.read_string()? }),
            DestinationType::CustomWebhook => DestinationConfig::CustomWebhook(CustomWebhook {
                url: input.read_optional_string()?,
                host: input.read_optional_string()?,
                port: input.read_i32()?,
                path: input.read_optional_string()?,
                query_params: read_string_map(input)?,
                header_params: read_string_map(input)?,
            }),
            DestinationType::Email => DestinationConfig::Email(Email {
                email_account_id: input.read_string()?,
                recipients: input.read_string_list()?,
            }),
            DestinationType::Sns => DestinationConfig::Sns(Sns {
                topic_arn: input.read_string()?,
                role_arn: input.read_optional_string()?,
            }),
            DestinationType::TestAction => DestinationConfig::TestAction,
        };
        Ok(Self {
            name,
            schema_version,
            user,
            last_update_time,
            config,
        })
    }
}
