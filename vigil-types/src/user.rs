//! Caller identity.
//!
//! A request either comes from an authenticated user carrying backend roles,
//! or from a cluster running with security disabled. Resources record their
//! owner as a [`User`]; with security disabled that owner is the anonymous
//! user (empty name, no roles).

use crate::stream::{Readable, StreamError, StreamInput, StreamOutput, Writeable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role that bypasses per-resource backend-role filtering.
pub const ALL_ACCESS_ROLE: &str = "all_access";

/// A principal with its backend roles and security roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub backend_roles: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub custom_attribute_names: Vec<String>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        backend_roles: Vec<String>,
        roles: Vec<String>,
        custom_attribute_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            backend_roles,
            roles,
            custom_attribute_names,
        }
    }

    /// The owner stamped on resources written with security disabled.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty() && self.backend_roles.is_empty() && self.roles.is_empty()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ALL_ACCESS_ROLE)
    }

    /// Whether the two users have at least one backend role in common.
    #[must_use]
    pub fn shares_backend_role_with(&self, other: &User) -> bool {
        let mine: HashSet<&str> = self.backend_roles.iter().map(String::as_str).collect();
        other.backend_roles.iter().any(|r| mine.contains(r.as_str()))
    }
}

impl Writeable for User {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(&self.name);
        out.write_string_list(&self.backend_roles);
        out.write_string_list(&self.roles);
        out.write_string_list(&self.custom_attribute_names);
    }
}

impl Readable for User {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            name: input.read_string()?,
            backend_roles: input.read_string_list()?,
            roles: input.read_string_list()?,
            custom_attribute_names: input.read_string_list()?,
        })
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// An authenticated principal.
    Authenticated(User),
    /// The security layer is not installed; there is no principal.
    SecurityDisabled,
}

impl Caller {
    /// The owner to stamp on a resource written by this caller.
    #[must_use]
    pub fn owner(&self) -> User {
        match self {
            Self::Authenticated(user) => user.clone(),
            Self::SecurityDisabled => User::anonymous(),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::SecurityDisabled => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Authenticated(user) => &user.name,
            Self::SecurityDisabled => "",
        }
    }
}
