use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Version stamp of a tree node
///
/// Stamps come from one counter per data tree, so two distinct commits never
/// share a stamp and comparing stamps is enough to detect a concurrent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub fn initial() -> Self {
        Version(0)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Shared monotonic source of versions
#[derive(Debug, Clone, Default)]
pub(crate) struct VersionCounter(Arc<AtomicU64>);

impl VersionCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next(&self) -> Version {
        Version(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
