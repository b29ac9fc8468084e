//! REST-style enums shared by requests and responses.

use crate::stream::WireEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP-style status attached to responses and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestStatus {
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    InternalServerError,
}

impl RestStatus {
    /// Numeric HTTP status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InternalServerError => 500,
        }
    }
}

impl fmt::Display for RestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Created => "CREATED",
            Self::BadRequest => "BAD_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        };
        f.write_str(name)
    }
}

impl WireEnum for RestStatus {
    const NAME: &'static str = "RestStatus";

    fn ordinal(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Created => 1,
            Self::BadRequest => 2,
            Self::Forbidden => 3,
            Self::NotFound => 4,
            Self::Conflict => 5,
            Self::InternalServerError => 6,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        Some(match ordinal {
            0 => Self::Ok,
            1 => Self::Created,
            2 => Self::BadRequest,
            3 => Self::Forbidden,
            4 => Self::NotFound,
            5 => Self::Conflict,
            6 => Self::InternalServerError,
            _ => return None,
        })
    }
}

/// Request method; selects create (`Post`) versus update (`Put`) for writes
/// and full (`Get`) versus existence-only (`Head`) reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl WireEnum for RestMethod {
    const NAME: &'static str = "RestMethod";

    fn ordinal(self) -> u8 {
        match self {
            Self::Get => 0,
            Self::Post => 1,
            Self::Put => 2,
            Self::Delete => 3,
            Self::Head => 4,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        Some(match ordinal {
            0 => Self::Get,
            1 => Self::Post,
            2 => Self::Put,
            3 => Self::Delete,
            4 => Self::Head,
            _ => return None,
        })
    }
}

/// When a write becomes visible to searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Return as soon as the write is durable; visibility follows later.
    None,
    /// Force a refresh as part of the write.
    #[default]
    Immediate,
    /// Wait for the next scheduled refresh before returning.
    WaitUntil,
}

impl RefreshPolicy {
    /// Parses the `refresh` request parameter.
    ///
    /// `"false"` → `None`, `"true"` or `""` → `Immediate`,
    /// `"wait_for"` → `WaitUntil`.
    pub fn parse(value: &str) -> crate::Result<Self> {
        match value {
            "false" => Ok(Self::None),
            "true" | "" => Ok(Self::Immediate),
            "wait_for" => Ok(Self::WaitUntil),
            other => Err(crate::Error::InvalidRefreshPolicy(other.to_string())),
        }
    }

    /// Parameter value this policy parses from.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::None => "false",
            Self::Immediate => "true",
            Self::WaitUntil => "wait_for",
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl WireEnum for RefreshPolicy {
    const NAME: &'static str = "RefreshPolicy";

    fn ordinal(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Immediate => 1,
            Self::WaitUntil => 2,
        }
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        Some(match ordinal {
            0 => Self::None,
            1 => Self::Immediate,
            2 => Self::WaitUntil,
            _ => return None,
        })
    }
}
