//! Dynamic alerting settings.
//!
//! Settings are read from a TOML file whose keys may be written flat
//! (`"plugins.alerting.index_timeout" = "30s"`) or as nested tables. Every
//! `plugins.alerting.*` key falls back to its deprecated
//! `opendistro.alerting.*` spelling. [`ClusterSettings`] publishes updates
//! through a watch channel so running components see new values without a
//! restart.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use vigil_model::{DestinationType, MonitorType};

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for [{key}]: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A setting key and the deprecated key it replaces.
#[derive(Debug, Clone, Copy)]
pub struct SettingKey {
    pub key: &'static str,
    pub legacy: Option<&'static str>,
}

impl SettingKey {
    const fn new(key: &'static str, legacy: &'static str) -> Self {
        Self {
            key,
            legacy: Some(legacy),
        }
    }
}

pub const INDEX_TIMEOUT: SettingKey = SettingKey::new(
    "plugins.alerting.index_timeout",
    "opendistro.alerting.index_timeout",
);
pub const REQUEST_TIMEOUT: SettingKey = SettingKey::new(
    "plugins.alerting.request_timeout",
    "opendistro.alerting.request_timeout",
);
pub const FILTER_BY_BACKEND_ROLES: SettingKey = SettingKey::new(
    "plugins.alerting.filter_by_backend_roles",
    "opendistro.alerting.filter_by_backend_roles",
);
pub const DESTINATION_ALLOW_LIST: SettingKey = SettingKey::new(
    "plugins.alerting.destination.allow_list",
    "opendistro.alerting.destination.allow_list",
);
pub const MONITOR_ALLOW_LIST: SettingKey = SettingKey {
    key: "plugins.alerting.monitor.allow_list",
    legacy: None,
};
pub const ALERT_BACKOFF_MILLIS: SettingKey = SettingKey::new(
    "plugins.alerting.alert_backoff_millis",
    "opendistro.alerting.alert_backoff_millis",
);
pub const ALERT_BACKOFF_COUNT: SettingKey = SettingKey::new(
    "plugins.alerting.alert_backoff_count",
    "opendistro.alerting.alert_backoff_count",
);
pub const MOVE_ALERTS_BACKOFF_MILLIS: SettingKey = SettingKey::new(
    "plugins.alerting.move_alerts_backoff_millis",
    "opendistro.alerting.move_alerts_backoff_millis",
);
pub const MOVE_ALERTS_BACKOFF_COUNT: SettingKey = SettingKey::new(
    "plugins.alerting.move_alerts_backoff_count",
    "opendistro.alerting.move_alerts_backoff_count",
);

/// Exponential retry delays: `initial`, `2 * initial`, ... for `count` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub count: u32,
}

impl BackoffPolicy {
    #[must_use]
    pub const fn new(initial: Duration, count: u32) -> Self {
        Self { initial, count }
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.count).map(|attempt| {
            self.initial
                .saturating_mul(2u32.saturating_pow(attempt))
        })
    }
}

/// Current values of every alerting setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertingSettings {
    pub index_timeout: Duration,
    pub request_timeout: Duration,
    pub filter_by_backend_roles: bool,
    pub destination_allow_list: Vec<String>,
    pub monitor_allow_list: Vec<String>,
    pub alert_backoff: BackoffPolicy,
    pub move_alerts_backoff: BackoffPolicy,
}

impl Default for AlertingSettings {
    fn default() -> Self {
        Self {
            index_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            filter_by_backend_roles: false,
            destination_allow_list: DestinationType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            monitor_allow_list: MonitorType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            alert_backoff: BackoffPolicy::new(Duration::from_millis(50), 2),
            move_alerts_backoff: BackoffPolicy::new(Duration::from_millis(250), 3),
        }
    }
}

impl AlertingSettings {
    /// Loads settings from a TOML file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            info!("No settings file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&contents)?;
        info!("Loaded alerting settings from {:?}", path);
        Ok(settings)
    }

    /// Parses settings from TOML text, applying them over the defaults.
    pub fn from_toml_str(contents: &str) -> SettingsResult<Self> {
        Self::default().with_toml_str(contents)
    }

    /// Applies the keys present in `contents` over these settings.
    pub fn with_toml_str(self, contents: &str) -> SettingsResult<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        let mut flat = BTreeMap::new();
        flatten("", &table, &mut flat);
        self.apply(&flat)
    }

    fn apply(mut self, flat: &BTreeMap<String, toml::Value>) -> SettingsResult<Self> {
        if let Some(v) = lookup(flat, INDEX_TIMEOUT) {
            self.index_timeout = positive_time(INDEX_TIMEOUT, v)?;
        }
        if let Some(v) = lookup(flat, REQUEST_TIMEOUT) {
            self.request_timeout = positive_time(REQUEST_TIMEOUT, v)?;
        }
        if let Some(v) = lookup(flat, FILTER_BY_BACKEND_ROLES) {
            self.filter_by_backend_roles = v
                .as_bool()
                .ok_or_else(|| invalid(FILTER_BY_BACKEND_ROLES, "expected a boolean"))?;
        }
        if let Some(v) = lookup(flat, DESTINATION_ALLOW_LIST) {
            self.destination_allow_list = string_list(DESTINATION_ALLOW_LIST, v)?;
        }
        if let Some(v) = lookup(flat, MONITOR_ALLOW_LIST) {
            self.monitor_allow_list = string_list(MONITOR_ALLOW_LIST, v)?;
        }
        if let Some(v) = lookup(flat, ALERT_BACKOFF_MILLIS) {
            self.alert_backoff.initial = positive_time(ALERT_BACKOFF_MILLIS, v)?;
        }
        if let Some(v) = lookup(flat, ALERT_BACKOFF_COUNT) {
            self.alert_backoff.count = count(ALERT_BACKOFF_COUNT, v)?;
        }
        if let Some(v) = lookup(flat, MOVE_ALERTS_BACKOFF_MILLIS) {
            self.move_alerts_backoff.initial = positive_time(MOVE_ALERTS_BACKOFF_MILLIS, v)?;
        }
        if let Some(v) = lookup(flat, MOVE_ALERTS_BACKOFF_COUNT) {
            self.move_alerts_backoff.count = count(MOVE_ALERTS_BACKOFF_COUNT, v)?;
        }
        Ok(self)
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, toml::Value>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten(&full, nested, out),
            other => {
                out.insert(full, other.clone());
            }
        }
    }
}

fn lookup<'a>(flat: &'a BTreeMap<String, toml::Value>, setting: SettingKey) -> Option<&'a toml::Value> {
    if let Some(value) = flat.get(setting.key) {
        return Some(value);
    }
    let legacy = setting.legacy?;
    let value = flat.get(legacy)?;
    warn!(
        "[{}] setting was deprecated, use [{}] instead",
        legacy, setting.key
    );
    Some(value)
}

fn invalid(setting: SettingKey, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        key: setting.key.to_string(),
        reason: reason.into(),
    }
}

fn positive_time(setting: SettingKey, value: &toml::Value) -> SettingsResult<Duration> {
    let duration = match value {
        toml::Value::String(s) => {
            parse_time_value(s).map_err(|reason| invalid(setting, reason))?
        }
        toml::Value::Integer(ms) => u64::try_from(*ms)
            .map(Duration::from_millis)
            .map_err(|_| invalid(setting, "must not be negative"))?,
        _ => return Err(invalid(setting, "expected a time value such as \"60s\"")),
    };
    if duration.is_zero() {
        return Err(invalid(setting, "must be positive"));
    }
    Ok(duration)
}

fn count(setting: SettingKey, value: &toml::Value) -> SettingsResult<u32> {
    value
        .as_integer()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid(setting, "expected a non-negative integer"))
}

fn string_list(setting: SettingKey, value: &toml::Value) -> SettingsResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(setting, "expected an array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(setting, "expected an array of strings"))
        })
        .collect()
}

/// Parses a time value like `500ms`, `10s`, `5m`, `2h` or `1d`.
pub fn parse_time_value(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in time value [{value}]"))?;
    let (number, unit) = value.split_at(split);
    let amount: u64 = number
        .parse()
        .map_err(|_| format!("invalid number in time value [{value}]"))?;
    let millis_per_unit = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        other => return Err(format!("unknown time unit [{other}] in [{value}]")),
    };
    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("time value [{value}] is too large"))
}

/// Publishes the latest [`AlertingSettings`] to every subscriber.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    sender: Arc<watch::Sender<AlertingSettings>>,
}

impl ClusterSettings {
    #[must_use]
    pub fn new(initial: AlertingSettings) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AlertingSettings> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> AlertingSettings {
        self.sender.borrow().clone()
    }

    /// Applies `change` to the current settings and publishes the result.
    pub fn update(&self, change: impl FnOnce(&mut AlertingSettings)) {
        self.sender.send_modify(change);
    }

    /// Applies the keys in `contents` over the current settings; keys it
    /// omits keep their current value.
    ///
    /// On a parse error the published settings stay as they were.
    pub fn reload_from_toml(&self, contents: &str) -> SettingsResult<()> {
        let settings = self.current().with_toml_str(contents)?;
        self.sender.send_replace(settings);
        info!("Alerting settings reloaded");
        Ok(())
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self::new(AlertingSettings::default())
    }
}
