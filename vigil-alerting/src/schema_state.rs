//! Whether the shared index mapping is known to be current.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "mapping is current" flag, shared by every writer.
///
/// Only an acknowledged index creation or mapping update sets it. A stale
/// read costs at most one redundant mapping update.
#[derive(Debug, Default)]
pub struct SchemaState {
    updated: AtomicBool,
}

impl SchemaState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        self.updated.load(Ordering::Acquire)
    }

    pub fn mark_current(&self) {
        self.updated.store(true, Ordering::Release);
    }
}
