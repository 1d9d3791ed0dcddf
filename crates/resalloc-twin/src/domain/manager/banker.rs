//! Banker Manager
//!
//! Claim-aware admission. A task's INITIATE is refused when its claim
//! exceeds the capacity of the resource type. A REQUEST is refused outright
//! when it would take the task past its claim. Otherwise it is granted
//! only if the pool can still cover the task's whole remaining claim:
//!
//! ```text
//! available[r] >= claim[r] - held[r]
//! ```
//!
//! The test runs per resource type, not as a joint multi-resource safety
//! search. Blocked tasks simply wait; this policy never declares deadlock.

use super::{DispatchOutcome, Ledger, ResourceManager};
use crate::domain::action::{Action, ActionKind};
use crate::domain::error::SimError;
use crate::domain::pool::ResourcePool;
use crate::domain::task::Task;
use crate::domain::trace::{AbortReason, EventKind, EventLog, SimEvent};
use crate::domain::types::{Cycle, Policy};

/// Banker's-style avoidance manager
#[derive(Debug, Clone)]
pub struct BankerManager {
    ledger: Ledger,
}

impl BankerManager {
    /// Manage `pool` on behalf of `task_count` tasks
    pub fn new(pool: ResourcePool, task_count: usize) -> Self {
        Self {
            ledger: Ledger::new(pool, task_count),
        }
    }

    fn initiate(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        let (resource, claim) = (action.resource(), action.amount());
        let total = self.ledger.pool.total_of(resource)?;
        if claim > total {
            let reason = AbortReason::ClaimExceedsTotal {
                resource,
                claim,
                total,
            };
            return self.ledger.abort(task, reason, log);
        }

        task.initiate(resource, claim, self.ledger.cycle)?;
        log.record(SimEvent::task(
            self.ledger.cycle,
            task.id(),
            EventKind::Initiated { resource, claim },
        ));
        Ok(DispatchOutcome::Completed)
    }

    fn request(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        let (resource, requested) = (action.resource(), action.amount());
        let held = task.held(resource)?;
        let claim = task.claimed(resource)?;

        // checked before any compute cycle is spent
        if held.saturating_add(requested) > claim {
            let reason = AbortReason::RequestExceedsClaim {
                resource,
                requested,
                held,
                claim,
            };
            return self.ledger.abort(task, reason, log);
        }

        if self.ledger.compute(action, task, log) {
            return Ok(DispatchOutcome::Delayed);
        }

        let available = self.ledger.pool.available_of(resource)?;
        if available >= claim - held {
            self.ledger.grant(task, resource, requested, log)
        } else {
            Ok(self.ledger.block(task, resource, requested, available, log))
        }
    }
}

impl ResourceManager for BankerManager {
    fn policy(&self) -> Policy {
        Policy::Banker
    }

    fn pool(&self) -> &ResourcePool {
        &self.ledger.pool
    }

    fn cycle(&self) -> Cycle {
        self.ledger.cycle
    }

    fn task_count(&self) -> usize {
        self.ledger.task_count
    }

    fn dispatch(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        self.ledger.ensure_dispatchable(action, task)?;
        match action.kind() {
            ActionKind::Initiate => self.initiate(action, task, log),
            ActionKind::Request => self.request(action, task, log),
            ActionKind::Release => self.ledger.dispatch_release(action, task, log),
            ActionKind::Terminate => self.ledger.dispatch_terminate(action, task, log),
        }
    }

    fn commit_cycle(&mut self, log: &mut EventLog) {
        self.ledger.commit_cycle(log);
    }

    fn reset(&mut self) {
        self.ledger.reset();
    }

    fn into_pool(self) -> ResourcePool {
        self.ledger.pool
    }
}
