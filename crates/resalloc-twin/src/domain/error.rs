//! Contract Violations
//!
//! Everything in [`SimError`] is a bug in the driver or in the data handed to
//! the core: a run that hits one of these stops. Modeled business failures
//! (over-claims, infeasible claims, deadlock victims) never surface here; they
//! abort the offending task and are reported through
//! [`AbortReason`](super::trace::AbortReason).

use super::types::{Cycle, ResourceId, TaskId, Units};

/// Fatal simulation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Indexing
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Resource index outside `[0, resource_count)`
    #[error("{resource} is out of range (resource types: {resource_count})")]
    ResourceOutOfRange {
        /// Offending index
        resource: ResourceId,
        /// Declared resource type count
        resource_count: usize,
    },

    /// Task index outside `[0, task_count)`
    #[error("{task} is out of range (tasks: {task_count})")]
    TaskOutOfRange {
        /// Offending index
        task: TaskId,
        /// Declared task count
        task_count: usize,
    },

    /// An action was handed to a task it does not belong to
    #[error("action for {expected} dispatched to {actual}")]
    TaskMismatch {
        /// Owner named by the action
        expected: TaskId,
        /// Task that received it
        actual: TaskId,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Ledger
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Releasing more units than the task holds
    #[error("{task} cannot release {amount} of {resource}: holds {held}")]
    ReleaseExceedsHeld {
        /// Releasing task
        task: TaskId,
        /// Resource type released
        resource: ResourceId,
        /// Units the task holds
        held: Units,
        /// Units it tried to release
        amount: Units,
    },

    /// Granting more units than are available
    #[error("cannot take {amount} of {resource}: only {available} available")]
    InsufficientUnits {
        /// Resource type taken from
        resource: ResourceId,
        /// Units free this cycle
        available: Units,
        /// Units asked for
        amount: Units,
    },

    /// Unit arithmetic left the `u32` range
    #[error("unit count overflow on {resource}")]
    UnitOverflow {
        /// Resource type whose counter overflowed
        resource: ResourceId,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Dispatch reached a task that already terminated or aborted
    #[error("{task} is already finished")]
    TaskAlreadyFinished {
        /// Finished task
        task: TaskId,
    },

    /// A live task ran out of actions before terminating
    #[error("{task} has no pending action but never terminated")]
    ActionQueueExhausted {
        /// Task with an empty queue
        task: TaskId,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Run control
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// The run did not finish within the configured cycle budget
    #[error("simulation exceeded {max_cycles} cycles")]
    CycleLimitExceeded {
        /// Configured budget
        max_cycles: Cycle,
    },

    /// Every live task is blocked and nothing is pending: no future cycle can
    /// change the state
    #[error("simulation stalled at cycle {cycle}: {} task(s) blocked with nothing pending", .blocked.len())]
    Stalled {
        /// Cycle at which the stall was found
        cycle: Cycle,
        /// Blocked tasks, in id order
        blocked: Vec<TaskId>,
    },
}
