//! Optimistic Manager
//!
//! Grants any request the pool can cover right now and never looks at
//! claims. After every dispatch pass the driver asks it to detect and
//! break deadlock:
//!
//! 1. If at least one live task exists and every live task is blocked,
//!    the system is deadlocked.
//! 2. If some blocked request fits in `available + pending`, the next
//!    commit will unblock it and nothing is aborted.
//! 3. Otherwise abort the live task with the lowest id, return its units
//!    as pending, and repeat from 1.

use tracing::warn;

use super::{DispatchOutcome, Ledger, ResourceManager};
use crate::domain::action::{Action, ActionKind};
use crate::domain::error::SimError;
use crate::domain::pool::ResourcePool;
use crate::domain::task::Task;
use crate::domain::trace::{AbortReason, EventKind, EventLog, SimEvent};
use crate::domain::types::{Cycle, Policy};
use crate::domain::workload::Workload;

/// Whether every live task is blocked.
///
/// An empty set of live tasks is not a deadlock.
pub fn detect_deadlock(tasks: &[Task]) -> bool {
    let mut live = tasks.iter().filter(|t| !t.is_finished()).peekable();
    live.peek().is_some() && live.all(Task::is_blocked)
}

/// Optimistic (FIFO) resource manager
#[derive(Debug, Clone)]
pub struct OptimisticManager {
    ledger: Ledger,
}

impl OptimisticManager {
    /// Manage `pool` on behalf of `task_count` tasks
    pub fn new(pool: ResourcePool, task_count: usize) -> Self {
        Self {
            ledger: Ledger::new(pool, task_count),
        }
    }

    /// Whether some live task's current REQUEST fits into what the pool
    /// will hold after the next commit
    pub fn can_satisfy_any_request(
        &self,
        tasks: &[Task],
        workload: &Workload,
    ) -> Result<bool, SimError> {
        for task in tasks.iter().filter(|t| !t.is_finished()) {
            let Some(action) = workload.current_action(task) else {
                continue;
            };
            if action.kind() == ActionKind::Request
                && action.amount() <= self.ledger.pool.projected_of(action.resource())?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn initiate(
        &mut self,
        action: &Action,
        task: &mut Task,
        log: &mut EventLog,
    ) -> Result<DispatchOutcome, SimError> {
        let (resource, claim) = (action.resource(), action.amount());
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
        if self.ledger.compute(action, task, log) {
            return Ok(DispatchOutcome::Delayed);
        }
        let (resource, amount) = (action.resource(), action.amount());
        let available = self.ledger.pool.available_of(resource)?;
        if amount <= available {
            self.ledger.grant(task, resource, amount, log)
        } else {
            Ok(self.ledger.block(task, resource, amount, available, log))
        }
    }
}

impl ResourceManager for OptimisticManager {
    fn policy(&self) -> Policy {
        Policy::Optimistic
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

    fn resolve_deadlock(
        &mut self,
        tasks: &mut [Task],
        workload: &Workload,
        log: &mut EventLog,
    ) -> Result<usize, SimError> {
        if !detect_deadlock(tasks) {
            return Ok(0);
        }

        let blocked = tasks
            .iter()
            .filter(|t| !t.is_finished())
            .map(Task::id)
            .collect::<Vec<_>>();
        warn!(
            cycle = self.ledger.cycle,
            blocked = blocked.len(),
            "deadlock detected"
        );
        log.record(SimEvent::global(
            self.ledger.cycle,
            EventKind::DeadlockDetected { blocked },
        ));

        let mut aborted = 0;
        while detect_deadlock(tasks) && !self.can_satisfy_any_request(tasks, workload)? {
            let Some(victim) = tasks
                .iter_mut()
                .filter(|t| !t.is_finished())
                .min_by_key(|t| t.id())
            else {
                break;
            };
            warn!(cycle = self.ledger.cycle, task = %victim.id(), "aborting deadlock victim");
            self.ledger.abort(victim, AbortReason::DeadlockVictim, log)?;
            aborted += 1;
        }
        Ok(aborted)
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
