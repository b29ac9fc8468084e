//! Which resource sub-types may be written.

use crate::error::{AlertingError, AlertingResult};
use crate::settings::AlertingSettings;
use tokio::sync::watch;
use vigil_model::{Destination, Monitor, ScheduledJob};

/// Allow-list for one kind of scheduled job, read from the live settings.
#[derive(Debug, Clone)]
pub struct TypeAllowList {
    settings: watch::Receiver<AlertingSettings>,
    select: fn(&AlertingSettings) -> &Vec<String>,
    kind: &'static str,
}

impl TypeAllowList {
    #[must_use]
    pub fn destinations(settings: watch::Receiver<AlertingSettings>) -> Self {
        Self {
            settings,
            select: |s| &s.destination_allow_list,
            kind: Destination::DISPLAY_NAME,
        }
    }

    #[must_use]
    pub fn monitors(settings: watch::Receiver<AlertingSettings>) -> Self {
        Self {
            settings,
            select: |s| &s.monitor_allow_list,
            kind: Monitor::DISPLAY_NAME,
        }
    }

    #[must_use]
    pub fn is_allowed(&self, sub_type: &str) -> bool {
        let settings = self.settings.borrow();
        (self.select)(&*settings).iter().any(|t| t == sub_type)
    }

    pub fn check(&self, sub_type: &str) -> AlertingResult<()> {
        if self.is_allowed(sub_type) {
            return Ok(());
        }
        Err(AlertingError::Forbidden(format!(
            "{} type is not allowed: {}",
            self.kind, sub_type
        )))
    }
}
