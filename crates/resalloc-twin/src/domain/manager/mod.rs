//! Resource Managers - Policy Dispatch
//!
//! # Architecture
//!
//! ```text
//! ResourceManager (trait)          driver-facing seam
//!   ├─ OptimisticManager           grant on raw availability,
//!   │                              detect + recover from deadlock
//!   └─ BankerManager               claim-aware admission, never recovers
//!
//! Ledger                           state both policies share:
//!   ├─ pool: ResourcePool          the deferred-commit ledger
//!   ├─ task_count
//!   └─ cycle
//! ```
//!
//! # Shared Per-Action Contract
//!
//! | Kind      | Effect once its delay has elapsed                        |
//! |-----------|----------------------------------------------------------|
//! | INITIATE  | policy-specific (never delayed)                          |
//! | REQUEST   | policy-specific grant / block / abort                    |
//! | RELEASE   | units go to the pool's pending column, task unblocks     |
//! | TERMINATE | termination cycle recorded, leftover units returned      |
//!
//! While `task.delay < action.delay` a dispatch only advances the task's
//! compute counter. When the effect applies the counter resets to zero.

mod banker;
mod optimistic;

pub use banker::BankerManager;
pub use optimistic::{detect_deadlock, OptimisticManager};

use super::action::Action;
use super::error::SimError;
use super::pool::ResourcePool;
use super::task::Task;
use super::trace::{AbortReason, EventKind, EventLog, SimEvent};
use super::types::{Cycle, Policy, ResourceId, Units};
use super::workload::Workload;

/// Result of dispatching one action to one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The action's effect applied; the driver moves to the next action
    Completed,
    /// The task spent the cycle computing
    Delayed,
    /// The request could not be granted this cycle
    Blocked,
    /// The policy aborted the task
    Aborted(AbortReason),
}

/// Driver-facing interface of a deadlock-handling policy
pub trait ResourceManager {
    /// Which policy this manager implements
    fn policy(&self) -> Policy;

    /// The shared ledger
    fn pool(&self) -> &ResourcePool;

    /// Current cycle
    fn cycle(&self) -> Cycle;

    /// Number of tasks the manager was built for
    fn task_count(&self) -> usize;

    /// Apply `action` to `task` for the current cycle.
    ///
    /// # Errors
    /// Only contract violations: a finished task, an action belonging to
    /// another task, an out-of-range resource or a release beyond what is
    /// held. Business failures come back as [`DispatchOutcome::Aborted`].
    fn dispatch(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError>;

    /// Run after each dispatch pass; returns how many tasks were aborted.
    ///
    /// Policies that never declare deadlock keep the default.
    fn resolve_deadlock(
        &mut self,
        _tasks: &mut [Task],
        _workload: &Workload,
        _log: &mut EventLog,
    ) -> Result<usize, SimError> {
        Ok(0)
    }

    /// Commit pending releases and advance to the next cycle
    fn commit_cycle(&mut self, log: &mut EventLog);

    /// Restore the pool and the cycle counter to their initial state
    fn reset(&mut self);

    /// Give the ledger back, e.g. to rerun the workload under another policy
    fn into_pool(self) -> ResourcePool
    where
        Self: Sized;
}

/// State and primitive effects shared by both policies
#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    pub(crate) pool: ResourcePool,
    pub(crate) task_count: usize,
    pub(crate) cycle: Cycle,
}

impl Ledger {
    pub(crate) fn new(pool: ResourcePool, task_count: usize) -> Self {
        Self {
            pool,
            task_count,
            cycle: 0,
        }
    }

    /// Refuse finished tasks and foreign actions
    pub(crate) fn ensure_dispatchable(&self, action: &Action, task: &Task) -> Result<(), SimError> {
        if task.is_finished() {
            return Err(SimError::TaskAlreadyFinished { task: task.id() });
        }
        if action.task() != task.id() {
            return Err(SimError::TaskMismatch {
                expected: action.task(),
                actual: task.id(),
            });
        }
        if task.id().as_usize() >= self.task_count {
            return Err(SimError::TaskOutOfRange {
                task: task.id(),
                task_count: self.task_count,
            });
        }
        Ok(())
    }

    /// Spend a compute cycle if the action's delay has not elapsed.
    ///
    /// Returns `true` when the cycle was consumed by computing.
    pub(crate) fn compute(&self, action: &Action, task: &mut Task, log: &mut EventLog) -> bool {
        if !action.kind().honors_delay() || task.delay() >= action.delay() {
            return false;
        }
        let progress = task.tick_delay();
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Computing {
                progress,
                of: action.delay(),
            },
        ));
        true
    }

    pub(crate) fn grant(
        &mut self,
        task: &mut Task,
        resource: ResourceId,
        amount: Units,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        self.pool.decrement_available(resource, amount)?;
        let held = task.grant(resource, amount)?;
        task.reset_delay();
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Granted {
                resource,
                amount,
                held,
            },
        ));
        Ok(DispatchOutcome::Completed)
    }

    pub(crate) fn block(
        &self,
        task: &mut Task,
        resource: ResourceId,
        requested: Units,
        available: Units,
        log: &mut EventLog,
    ) -> DispatchOutcome {
        task.block(self.cycle);
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Blocked {
                resource,
                requested,
                available,
            },
        ));
        DispatchOutcome::Blocked
    }

    /// Abort `task` and return everything it holds as pending deltas
    pub(crate) fn abort(
        &mut self,
        task: &mut Task,
        reason: AbortReason,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        let returned = task.abort(self.cycle)?;
        self.return_units(&returned)?;
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Aborted { reason, returned },
        ));
        Ok(DispatchOutcome::Aborted(reason))
    }

    /// RELEASE: identical under every policy
    pub(crate) fn dispatch_release(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        if self.compute(action, task, log) {
            return Ok(DispatchOutcome::Delayed);
        }
        let resource = action.resource();
        let amount = action.amount();
        let held = task.release(resource, amount)?;
        self.pool.increment_pending(resource, amount)?;
        task.unblock();
        task.reset_delay();
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Released {
                resource,
                amount,
                held,
            },
        ));
        Ok(DispatchOutcome::Completed)
    }

    /// TERMINATE: identical under every policy
    pub(crate) fn dispatch_terminate(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        if self.compute(action, task, log) {
            return Ok(DispatchOutcome::Delayed);
        }
        let returned = task.terminate(self.cycle)?;
        self.return_units(&returned)?;
        log.record(SimEvent::task(
            self.cycle,
            task.id(),
            EventKind::Terminated { returned },
        ));
        Ok(DispatchOutcome::Completed)
    }

    pub(crate) fn commit_cycle(&mut self, log: &mut EventLog) {
        for (resource, units) in self.pool.commit() {
            log.record(SimEvent::global(
                self.cycle,
                EventKind::Committed { resource, units },
            ));
        }
        self.cycle += 1;
    }

    pub(crate) fn reset(&mut self) {
        self.pool.reset();
        self.cycle = 0;
    }

    fn return_units(&mut self, returned: &[(ResourceId, Units)]) -> Result<(), SimError> {
        returned
            .iter()
            .try_for_each(|&(resource, units)| self.pool.increment_pending(resource, units))
    }
}
