//! Core Identifier Types
//!
//! Tasks and resource types are addressed by 0-based newtype indices. The
//! workload text format and every human-readable rendering are 1-based, so
//! `Display` adds one while `as_usize` exposes the raw index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical simulation cycle. Cycle 0 is the first dispatch pass.
pub type Cycle = u32;

/// Number of units of a resource type.
pub type Units = u32;

/// Task identifier (0-based)
///
/// # Example
///
/// ```rust
/// use resalloc_twin::domain::TaskId;
///
/// let t = TaskId::new(0);
/// assert_eq!(t.as_usize(), 0);
/// assert_eq!(t.to_string(), "Task 1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Create a new task identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {}", self.0 + 1)
    }
}

/// Resource type identifier (0-based)
///
/// A `ResourceId` is only meaningful against a pool or task built for the
/// same resource count; indexing with an out-of-range id is reported as
/// [`SimError::ResourceOutOfRange`](super::SimError::ResourceOutOfRange).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub usize);

impl ResourceId {
    /// Create a new resource identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {}", self.0 + 1)
    }
}

/// Deadlock-handling policy of a resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Grant whenever units are available; detect deadlock and abort a victim.
    Optimistic,
    /// Refuse grants that fail the claim-aware safety test.
    Banker,
}

impl Policy {
    /// Section title used by the text report
    pub const fn report_title(self) -> &'static str {
        match self {
            Policy::Optimistic => "FIFO",
            Policy::Banker => "BANKER'S",
        }
    }

    /// Whether this policy runs deadlock detection and recovery
    #[inline(always)]
    pub const fn recovers_from_deadlock(self) -> bool {
        matches!(self, Policy::Optimistic)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Optimistic => write!(f, "optimistic"),
            Policy::Banker => write!(f, "banker"),
        }
    }
}
