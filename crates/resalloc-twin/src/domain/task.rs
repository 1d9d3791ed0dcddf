//! Task State Machine
//!
//! ```text
//! Unstarted ──initiate──> Active ──block──> Active+Blocked
//!     │                     │  ^──unblock/grant──┘
//!     │                     ├──terminate──> Terminated
//!     └──────abort──────────┴──abort──────> Aborted
//! ```
//!
//! # Invariants
//!
//! - `held[r]` never goes negative: releases are checked and report
//!   [`SimError::ReleaseExceedsHeld`].
//! - Exactly one of Unstarted/Active, Terminated, Aborted holds. Both
//!   terminal states are absorbing; every mutator refuses a finished task.
//! - A task is blocked iff `blocked_since` is set; unblocking clears it.
//! - Terminal transitions hand every held unit back to the caller, which
//!   must return them to the pool.

use super::error::SimError;
use super::types::{Cycle, ResourceId, TaskId, Units};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// No INITIATE has been applied yet
    Unstarted,
    /// Running (possibly blocked)
    Active,
    /// Finished through TERMINATE
    Terminated,
    /// Finished through an abort
    Aborted,
}

impl Lifecycle {
    /// Whether the phase is absorbing
    #[inline(always)]
    pub const fn is_finished(self) -> bool {
        matches!(self, Lifecycle::Terminated | Lifecycle::Aborted)
    }
}

/// Mutable per-task simulation state
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    held: Vec<Units>,
    claimed: Vec<Units>,
    lifecycle: Lifecycle,
    /// Cycles spent computing on the current action
    delay: u32,
    blocked_since: Option<Cycle>,
    time_created: Option<Cycle>,
    time_terminated: Option<Cycle>,
    blocked_cycles: u32,
    /// Index of the next pending action in this task's queue
    cursor: usize,
}

impl Task {
    /// Create an unstarted task able to hold `resource_count` resource types
    pub fn new(id: TaskId, resource_count: usize) -> Self {
        Self {
            id,
            held: vec![0; resource_count],
            claimed: vec![0; resource_count],
            lifecycle: Lifecycle::Unstarted,
            delay: 0,
            blocked_since: None,
            time_created: None,
            time_terminated: None,
            blocked_cycles: 0,
            cursor: 0,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Task identifier
    #[inline(always)]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle phase
    #[inline(always)]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Terminated or aborted
    #[inline(always)]
    pub const fn is_finished(&self) -> bool {
        self.lifecycle.is_finished()
    }

    /// Aborted by a policy
    #[inline(always)]
    pub const fn is_aborted(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Aborted)
    }

    /// Waiting for units
    #[inline(always)]
    pub const fn is_blocked(&self) -> bool {
        self.blocked_since.is_some()
    }

    /// Cycle at which the current blocking episode began
    #[inline(always)]
    pub const fn blocked_since(&self) -> Option<Cycle> {
        self.blocked_since
    }

    /// Units of `resource` currently held
    pub fn held(&self, resource: ResourceId) -> Result<Units, SimError> {
        self.held
            .get(resource.as_usize())
            .copied()
            .ok_or_else(|| self.out_of_range(resource))
    }

    /// Declared claim on `resource`
    pub fn claimed(&self, resource: ResourceId) -> Result<Units, SimError> {
        self.claimed
            .get(resource.as_usize())
            .copied()
            .ok_or_else(|| self.out_of_range(resource))
    }

    /// Held units for every resource type, indexed by resource id
    pub fn held_all(&self) -> &[Units] {
        &self.held
    }

    /// Number of resource types this task tracks
    pub fn resource_count(&self) -> usize {
        self.held.len()
    }

    /// Compute cycles already spent on the current action
    #[inline(always)]
    pub const fn delay(&self) -> u32 {
        self.delay
    }

    /// Cycle of the first applied INITIATE
    #[inline(always)]
    pub const fn time_created(&self) -> Option<Cycle> {
        self.time_created
    }

    /// Cycle at which the task terminated or aborted
    #[inline(always)]
    pub const fn time_terminated(&self) -> Option<Cycle> {
        self.time_terminated
    }

    /// Total cycles spent blocked
    #[inline(always)]
    pub const fn blocked_cycles(&self) -> u32 {
        self.blocked_cycles
    }

    /// Index of the next pending action
    #[inline(always)]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshot of the fields the reporting layer renders
    pub fn outcome(&self) -> TaskOutcome {
        TaskOutcome {
            task: self.id,
            terminated_at: self.time_terminated,
            blocked_cycles: self.blocked_cycles,
            aborted: self.is_aborted(),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Transitions
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Record a claim on `resource` and mark the task active
    pub fn initiate(
        &mut self,
        resource: ResourceId,
        claim: Units,
        at_cycle: Cycle,
    ) -> Result<(), SimError> {
        self.ensure_live()?;
        let slot = self.claimed_slot(resource)?;
        *slot = claim;
        self.time_created.get_or_insert(at_cycle);
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    /// Spend one more cycle computing; returns the new progress
    pub fn tick_delay(&mut self) -> u32 {
        self.delay += 1;
        self.delay
    }

    /// Clear compute progress once an action's effect applies
    pub fn reset_delay(&mut self) {
        self.delay = 0;
    }

    /// Add `amount` units of `resource` and clear any blocking
    pub fn grant(&mut self, resource: ResourceId, amount: Units) -> Result<Units, SimError> {
        self.ensure_live()?;
        let slot = self.held_slot(resource)?;
        *slot = slot
            .checked_add(amount)
            .ok_or(SimError::UnitOverflow { resource })?;
        let now_held = *slot;
        self.unblock();
        Ok(now_held)
    }

    /// Remove `amount` units of `resource`; returns what is still held
    pub fn release(&mut self, resource: ResourceId, amount: Units) -> Result<Units, SimError> {
        self.ensure_live()?;
        let task = self.id;
        let slot = self.held_slot(resource)?;
        let held = *slot;
        *slot = held.checked_sub(amount).ok_or(SimError::ReleaseExceedsHeld {
            task,
            resource,
            held,
            amount,
        })?;
        Ok(*slot)
    }

    /// Mark the task blocked. The first cycle of an episode is kept on repeats.
    pub fn block(&mut self, at_cycle: Cycle) {
        self.blocked_since.get_or_insert(at_cycle);
    }

    /// Clear blocking
    pub fn unblock(&mut self) {
        self.blocked_since = None;
    }

    /// Count one cycle spent blocked
    pub fn note_blocked_cycle(&mut self) {
        self.blocked_cycles += 1;
    }

    /// Move the cursor to the next action
    pub fn advance_cursor(&mut self) {
        self.cursor += 1;
    }

    /// Abort the task at `at_cycle`.
    ///
    /// Returns every held `(resource, units)` pair; the caller owns returning
    /// them to the pool.
    pub fn abort(&mut self, at_cycle: Cycle) -> Result<Vec<(ResourceId, Units)>, SimError> {
        self.finish(Lifecycle::Aborted, at_cycle)
    }

    /// Terminate the task at `at_cycle`.
    ///
    /// Units still held are handed back exactly as for [`Task::abort`].
    pub fn terminate(&mut self, at_cycle: Cycle) -> Result<Vec<(ResourceId, Units)>, SimError> {
        self.finish(Lifecycle::Terminated, at_cycle)
    }

    fn finish(
        &mut self,
        terminal: Lifecycle,
        at_cycle: Cycle,
    ) -> Result<Vec<(ResourceId, Units)>, SimError> {
        self.ensure_live()?;
        let released = self
            .held
            .iter_mut()
            .enumerate()
            .filter(|(_, units)| **units > 0)
            .map(|(r, units)| (ResourceId(r), std::mem::take(units)))
            .collect();
        self.lifecycle = terminal;
        self.time_terminated = Some(at_cycle);
        self.delay = 0;
        self.unblock();
        Ok(released)
    }

    fn ensure_live(&self) -> Result<(), SimError> {
        if self.is_finished() {
            return Err(SimError::TaskAlreadyFinished { task: self.id });
        }
        Ok(())
    }

    fn held_slot(&mut self, resource: ResourceId) -> Result<&mut Units, SimError> {
        let resource_count = self.held.len();
        self.held
            .get_mut(resource.as_usize())
            .ok_or(SimError::ResourceOutOfRange {
                resource,
                resource_count,
            })
    }

    fn claimed_slot(&mut self, resource: ResourceId) -> Result<&mut Units, SimError> {
        let resource_count = self.claimed.len();
        self.claimed
            .get_mut(resource.as_usize())
            .ok_or(SimError::ResourceOutOfRange {
                resource,
                resource_count,
            })
    }

    fn out_of_range(&self, resource: ResourceId) -> SimError {
        SimError::ResourceOutOfRange {
            resource,
            resource_count: self.held.len(),
        }
    }
}

/// Per-task result handed to the reporting layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task identifier
    pub task: TaskId,
    /// Cycle of termination or abort; `None` only for a task that never finished
    pub terminated_at: Option<Cycle>,
    /// Cycles spent blocked
    pub blocked_cycles: u32,
    /// Whether a policy aborted the task
    pub aborted: bool,
}
