//! Monitors: periodically evaluated searches with triggers.
//!
//! Inputs and triggers are opaque JSON here; only their counts are
//! validated. Evaluation happens elsewhere.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vigil_types::{Readable, StreamError, StreamInput, StreamOutput, User, WireEnum, Writeable};

/// Maximum number of inputs a monitor may declare.
pub const MONITOR_MAX_INPUTS: usize = 1;

/// Maximum number of triggers a monitor may declare.
pub const MONITOR_MAX_TRIGGERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    #[default]
    QueryLevelMonitor,
    BucketLevelMonitor,
}

impl MonitorType {
    pub const ALL: [MonitorType; 2] = [Self::QueryLevelMonitor, Self::BucketLevelMonitor];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryLevelMonitor => "query_level_monitor",
            Self::BucketLevelMonitor => "bucket_level_monitor",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::Validation(format!("unknown monitor type: {s}")))
    }
}

impl WireEnum for MonitorType {
    const NAME: &'static str = "MonitorType";

    fn ordinal(self) -> u8 {
        match self {
            Self::QueryLevelMonitor => 0,
            Self::BucketLevelMonitor => 1,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl WireEnum for IntervalUnit {
    const NAME: &'static str = "IntervalUnit";

    fn ordinal(self) -> u8 {
        match self {
            Self::Minutes => 0,
            Self::Hours => 1,
            Self::Days => 2,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Minutes),
            1 => Some(Self::Hours),
            2 => Some(Self::Days),
            _ => None,
        }
    }
}

/// When a monitor runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Period { interval: i32, unit: IntervalUnit },
    Cron { expression: String, timezone: String },
}

impl Schedule {
    fn validate(&self) -> ModelResult<()> {
        match self {
            Self::Period { interval, .. } if *interval <= 0 => Err(ModelError::Validation(
                "Schedule interval must be positive".into(),
            )),
            Self::Cron { expression, .. } if expression.trim().is_empty() => Err(
                ModelError::Validation("Cron expression must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }
}

impl Writeable for Schedule {
    fn write_to(&self, out: &mut StreamOutput) {
        match self {
            Self::Period { interval, unit } => {
                out.write_byte(0);
                out.write_i32(*interval);
                out.write_enum(*unit);
            }
            Self::Cron {
                expression,
                timezone,
            } => {
                out.write_byte(1);
                out.write_string(expression);
                out.write_string(timezone);
            }
        }
    }
}

impl Readable for Schedule {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        match input.read_byte()? {
            0 => Ok(Self::Period {
                interval: input.read_i32()?,
                unit: input.read_enum()?,
            }),
            1 => Ok(Self::Cron {
                expression: input.read_string()?,
                timezone: input.read_string()?,
            }),
            ordinal => Err(StreamError::InvalidOrdinal {
                kind: "Schedule",
                ordinal,
            }),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A scheduled search with trigger conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,
    #[serde(default)]
    pub monitor_type: MonitorType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub schedule: Schedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_time: Option<i64>,
    #[serde(default)]
    pub inputs: Vec<serde_json::Value>,
    #[serde(default)]
    pub triggers: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub schema_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<i64>,
}

impl Monitor {
    pub fn new(name: impl Into<String>, monitor_type: MonitorType, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            monitor_type,
            enabled: true,
            schedule,
            enabled_time: None,
            inputs: Vec::new(),
            triggers: Vec::new(),
            user: None,
            schema_version: 0,
            last_update_time: None,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Validation("Monitor name must not be empty".into()));
        }
        if self.inputs.len() > MONITOR_MAX_INPUTS {
            return Err(ModelError::Validation(format!(
                "Monitors can only have {MONITOR_MAX_INPUTS} search input."
            )));
        }
        if self.triggers.len() > MONITOR_MAX_TRIGGERS {
            return Err(ModelError::Validation(format!(
                "Monitors can only support up to {MONITOR_MAX_TRIGGERS} triggers."
            )));
        }
        self.schedule.validate()
    }

    /// Stamps the update time; an enabled monitor keeps (or gains) an
    /// enabled time, a disabled one loses it.
    pub fn touch(&mut self, now: i64) {
        self.last_update_time = Some(now);
        self.enabled_time = if self.enabled {
            Some(self.enabled_time.unwrap_or(now))
        } else {
            None
        };
    }
}

impl Writeable for Monitor {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(&self.name);
        out.write_enum(self.monitor_type);
        out.write_bool(self.enabled);
        self.schedule.write_to(out);
        out.write_optional_i64(self.enabled_time);
        out.write_list(&self.inputs);
        out.write_list(&self.triggers);
        out.write_optional(self.user.as_ref());
        out.write_i32(self.schema_version);
        out.write_optional_i64(self.last_update_time);
    }
}

impl Readable for Monitor {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            name: input.read_string()?,
            monitor_type: input.read_enum()?,
            enabled: input.read_bool()?,
            schedule: Schedule::read_from(input)?,
            enabled_time: input.read_optional_i64()?,
            inputs: input.read_list()?,
            triggers: input.read_list()?,
            user: input.read_optional()?,
            schema_version: input.read_i32()?,
            last_update_time: input.read_optional_i64()?,
        })
    }
}
