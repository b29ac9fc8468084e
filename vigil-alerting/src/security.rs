//! Backend-role access checks.
//!
//! Filtering only applies while `filter_by_backend_roles` is on and security
//! is enabled. Admins (`all_access`) always pass.

use crate::error::{AlertingError, AlertingResult};
use crate::settings::AlertingSettings;
use tokio::sync::watch;
use tracing::debug;
use vigil_types::{Caller, User};

#[derive(Debug, Clone)]
pub struct AccessGate {
    settings: watch::Receiver<AlertingSettings>,
}

impl AccessGate {
    #[must_use]
    pub fn new(settings: watch::Receiver<AlertingSettings>) -> Self {
        Self { settings }
    }

    fn filter_by_enabled(&self) -> bool {
        self.settings.borrow().filter_by_backend_roles
    }

    /// The filtering subject, or `None` when no check applies.
    fn filtered_user<'a>(&self, caller: &'a Caller) -> Option<&'a User> {
        if !self.filter_by_enabled() {
            return None;
        }
        caller.user().filter(|user| !user.is_admin())
    }

    /// Pre-check: a filtered caller must hold at least one backend role.
    pub fn validate_user_backend_roles(&self, caller: &Caller) -> AlertingResult<()> {
        match self.filtered_user(caller) {
            Some(user) if user.backend_roles.is_empty() => Err(AlertingError::Forbidden(
                "User doesn't have backend roles configured. Contact administrator.".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Post-check: a filtered caller must share a backend role with the
    /// resource owner. Resources without an owner, or owned by the
    /// anonymous user, are open to everyone.
    pub fn check_user_permissions_with_resource(
        &self,
        caller: &Caller,
        owner: Option<&User>,
        kind: &str,
        resource_id: &str,
    ) -> AlertingResult<()> {
        let Some(user) = self.filtered_user(caller) else {
            return Ok(());
        };
        let Some(owner) = owner.filter(|o| !o.is_anonymous()) else {
            return Ok(());
        };
        if user.shares_backend_role_with(owner) {
            return Ok(());
        }
        debug!(
            "User {} denied access to {} {} owned by {}",
            user.name, kind, resource_id, owner.name
        );
        Err(AlertingError::Forbidden(format!(
            "Do not have permissions to resource, {resource_id}"
        )))
    }
}

