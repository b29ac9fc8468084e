//! Optimistic concurrency tokens.
//!
//! The store assigns a sequence number and a primary term on every
//! successful write. Together they identify one version of a document and
//! serve as compare-and-swap preconditions on later writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-index sequence number of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeqNo(i64);

impl SeqNo {
    /// No sequence number; as a precondition it means "don't check".
    pub const UNASSIGNED: SeqNo = SeqNo(-2);

    /// Sequence number of an index that has not seen a write yet.
    pub const NO_OPS_PERFORMED: SeqNo = SeqNo(-1);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true for a value the store could have assigned.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 >= 0
    }
}

impl Default for SeqNo {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for SeqNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Term of the primary copy that accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryTerm(i64);

impl PrimaryTerm {
    /// No primary term; as a precondition it means "don't check".
    pub const UNASSIGNED: PrimaryTerm = PrimaryTerm(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Assigned terms start at 1.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl Default for PrimaryTerm {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for PrimaryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
