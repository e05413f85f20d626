//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Numeric key for one action or observation.
///
/// Assigned by a spec registry build and only meaningful until the next
/// rebuild (Join or Reset) of that registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(pub u64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`SessionId`] allocation.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one connection's session for the lifetime of the process.
///
/// Allocated from a monotonic atomic counter via [`SessionId::next`], so
/// a reconnecting client never reuses the id of a dropped session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh, unique session ID. Thread-safe.
    pub fn next() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}
