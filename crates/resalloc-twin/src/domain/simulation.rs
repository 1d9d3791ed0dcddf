//! Simulation Driver - Cycle Loop
//!
//! # Cycle Anatomy
//!
//! ```text
//! ┌─ order live tasks: blocked first (blocked_since, id), then by id
//! ├─ dispatch each task's current action
//! │    Completed -> advance cursor
//! │    Blocked   -> count a blocked cycle
//! ├─ manager.resolve_deadlock()        (Optimistic aborts victims here)
//! ├─ stall check: all live tasks blocked and nothing pending
//! └─ manager.commit_cycle()            pending -> available, cycle += 1
//! ```
//!
//! The loop ends when every task is terminated or aborted. A cycle limit
//! bounds runaway workloads, matching the safety limit idiom of a bounded
//! event loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::SimError;
use super::manager::{BankerManager, DispatchOutcome, OptimisticManager, ResourceManager};
use super::pool::ResourcePool;
use super::task::{Task, TaskOutcome};
use super::trace::{EventLog, EventLogConfig, SimEvent};
use super::types::{Cycle, Policy, TaskId, Units};
use super::workload::Workload;

/// Default upper bound on simulated cycles
pub const DEFAULT_MAX_CYCLES: Cycle = 100_000;

/// Driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Cycles after which a run fails with `CycleLimitExceeded`
    pub max_cycles: Cycle,
    /// In-memory event log settings
    pub events: EventLogConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            events: EventLogConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Start a fluent builder
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }
}

/// Fluent construction of a [`SimulationConfig`]
///
/// ```rust
/// use resalloc_twin::domain::SimulationBuilder;
///
/// let config = SimulationBuilder::new()
///     .max_cycles(500)
///     .record_events(false)
///     .build();
/// assert_eq!(config.max_cycles, 500);
/// assert!(!config.events.enabled);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    config: SimulationConfig,
}

impl SimulationBuilder {
    /// Builder over the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle limit
    pub fn max_cycles(mut self, max_cycles: Cycle) -> Self {
        self.config.max_cycles = max_cycles;
        self
    }

    /// Keep events in memory
    pub fn record_events(mut self, enabled: bool) -> Self {
        self.config.events.enabled = enabled;
        self
    }

    /// Cap the in-memory event log
    pub fn max_events(mut self, max_events: usize) -> Self {
        self.config.events.max_events = max_events;
        self
    }

    /// Finish the configuration
    pub fn build(self) -> SimulationConfig {
        self.config
    }
}

/// Result of one complete run under one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Policy that produced the run
    pub policy: Policy,
    /// Cycles simulated
    pub cycles: Cycle,
    /// Per-task outcome in task id order
    pub outcomes: Vec<TaskOutcome>,
    /// Recorded event stream
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
    /// Events that did not fit the in-memory log
    #[serde(skip_serializing_if = "is_zero")]
    pub dropped_events: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl RunReport {
    /// Number of aborted tasks
    pub fn aborted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.aborted).count()
    }
}

/// Both policies run over the same workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Optimistic run
    pub optimistic: RunReport,
    /// Banker run
    pub banker: RunReport,
}

impl Comparison {
    /// Reports in presentation order
    pub fn reports(&self) -> [&RunReport; 2] {
        [&self.optimistic, &self.banker]
    }
}

/// Cycle-driven simulation of one workload under one manager
#[derive(Debug)]
pub struct Simulation<'w, M: ResourceManager> {
    workload: &'w Workload,
    manager: M,
    tasks: Vec<Task>,
    log: EventLog,
    config: SimulationConfig,
}

impl<'w, M: ResourceManager> Simulation<'w, M> {
    /// Prepare a run of `workload` under `manager`
    pub fn new(workload: &'w Workload, manager: M, config: SimulationConfig) -> Self {
        Self {
            workload,
            manager,
            tasks: workload.spawn_tasks(),
            log: EventLog::new(config.events),
            config,
        }
    }

    /// Task state in id order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The manager driving this run
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// The event log so far
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Current cycle
    pub fn cycle(&self) -> Cycle {
        self.manager.cycle()
    }

    /// Whether every task is terminated or aborted
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(Task::is_finished)
    }

    /// Whether `available + Σ held == total` for every resource type.
    ///
    /// Holds at every commit boundary.
    pub fn conserves_units(&self) -> bool {
        let pool = self.manager.pool();
        pool.totals().iter().enumerate().all(|(r, &total)| {
            let held: u64 = self
                .tasks
                .iter()
                .map(|t| u64::from(t.held_all()[r]))
                .sum();
            u64::from(pool.available()[r]) + held == u64::from(total)
        })
    }

    /// Live tasks in dispatch order
    fn dispatch_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tasks.len())
            .filter(|&i| !self.tasks[i].is_finished())
            .collect();
        order.sort_by_key(|&i| {
            let task = &self.tasks[i];
            match task.blocked_since() {
                Some(since) => (false, since, task.id()),
                None => (true, 0, task.id()),
            }
        });
        order
    }

    /// Simulate one cycle
    ///
    /// # Errors
    /// - `CycleLimitExceeded` once `max_cycles` cycles have run
    /// - `ActionQueueExhausted` when a live task has no action left
    /// - `Stalled` when every live task is blocked and nothing is pending
    /// - any contract violation reported by the manager
    pub fn step(&mut self) -> Result<(), SimError> {
        let cycle = self.manager.cycle();
        if cycle >= self.config.max_cycles {
            return Err(SimError::CycleLimitExceeded {
                max_cycles: self.config.max_cycles,
            });
        }

        for idx in self.dispatch_order() {
            let task = &mut self.tasks[idx];
            let action = *self
                .workload
                .current_action(task)
                .ok_or(SimError::ActionQueueExhausted { task: task.id() })?;

            match self.manager.dispatch(&action, task, &mut self.log)? {
                DispatchOutcome::Completed => task.advance_cursor(),
                DispatchOutcome::Blocked => task.note_blocked_cycle(),
                DispatchOutcome::Delayed | DispatchOutcome::Aborted(_) => {}
            }
        }

        let aborted = self
            .manager
            .resolve_deadlock(&mut self.tasks, self.workload, &mut self.log)?;
        if aborted > 0 {
            debug!(cycle, aborted, "deadlock recovery finished");
        }

        self.check_stall(cycle)?;
        self.manager.commit_cycle(&mut self.log);
        debug_assert!(self.conserves_units());
        Ok(())
    }

    fn check_stall(&self, cycle: Cycle) -> Result<(), SimError> {
        let mut blocked: Vec<TaskId> = Vec::new();
        for task in self.tasks.iter().filter(|t| !t.is_finished()) {
            if !task.is_blocked() {
                return Ok(());
            }
            blocked.push(task.id());
        }
        if blocked.is_empty() || self.manager.pool().has_pending() {
            return Ok(());
        }
        Err(SimError::Stalled { cycle, blocked })
    }

    /// Step until every task has finished
    ///
    /// # Errors
    /// See [`Simulation::step`].
    pub fn run_to_completion(&mut self) -> Result<(), SimError> {
        while !self.is_finished() {
            self.step()?;
        }
        info!(
            policy = %self.manager.policy(),
            cycles = self.manager.cycle(),
            tasks = self.tasks.len(),
            aborted = self.tasks.iter().filter(|t| t.is_aborted()).count(),
            "simulation finished"
        );
        Ok(())
    }

    /// Snapshot of the run so far
    pub fn report(&self) -> RunReport {
        RunReport {
            policy: self.manager.policy(),
            cycles: self.manager.cycle(),
            outcomes: self.tasks.iter().map(Task::outcome).collect(),
            events: self.log.events().to_vec(),
            dropped_events: self.log.dropped(),
        }
    }

    /// Run to completion and report
    ///
    /// # Errors
    /// See [`Simulation::step`].
    pub fn run(mut self) -> Result<RunReport, SimError> {
        self.run_to_completion()?;
        Ok(self.report())
    }

    /// Discard all progress: fresh tasks, an empty log, a reset pool
    pub fn reset(&mut self) {
        self.tasks = self.workload.spawn_tasks();
        self.log = EventLog::new(self.config.events);
        self.manager.reset();
    }

    /// Hand the manager back
    pub fn into_manager(self) -> M {
        self.manager
    }
}

/// Run `workload` under `policy` over a fresh pool
///
/// # Errors
/// See [`Simulation::step`].
pub fn run_policy(
    workload: &Workload,
    policy: Policy,
    config: SimulationConfig,
) -> Result<RunReport, SimError> {
    let pool = ResourcePool::new(workload.totals().to_vec());
    let task_count = workload.task_count();
    match policy {
        Policy::Optimistic => {
            Simulation::new(workload, OptimisticManager::new(pool, task_count), config).run()
        }
        Policy::Banker => {
            Simulation::new(workload, BankerManager::new(pool, task_count), config).run()
        }
    }
}

/// Run `workload` under Optimistic, then under Banker on the reset pool
///
/// # Errors
/// See [`Simulation::step`].
pub fn compare(workload: &Workload, config: SimulationConfig) -> Result<Comparison, SimError> {
    let task_count = workload.task_count();
    let pool = ResourcePool::new(workload.totals().to_vec());

    let mut optimistic =
        Simulation::new(workload, OptimisticManager::new(pool, task_count), config);
    optimistic.run_to_completion()?;
    let optimistic_report = optimistic.report();

    let mut pool = optimistic.into_manager().into_pool();
    pool.reset();
    let banker = Simulation::new(workload, BankerManager::new(pool, task_count), config).run()?;

    Ok(Comparison {
        optimistic: optimistic_report,
        banker,
    })
}

/// Total units held across `tasks` for every resource type
pub fn held_totals(tasks: &[Task], resource_count: usize) -> Vec<Units> {
    let mut totals = vec![0; resource_count];
    for task in tasks {
        for (slot, &held) in totals.iter_mut().zip(task.held_all()) {
            *slot += held;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::EventKind;
    use crate::domain::types::ResourceId;

    fn scenario_one() -> Workload {
        Workload::builder(&[10])
            .initiate(0, 0, 10)
            .request(0, 0, 0, 6)
            .release(0, 0, 0, 6)
            .terminate(0, 0)
            .initiate(1, 0, 10)
            .request(1, 0, 0, 5)
            .release(1, 0, 0, 5)
            .terminate(1, 0)
            .build()
            .unwrap()
    }

    fn optimistic(workload: &Workload) -> Simulation<'_, OptimisticManager> {
        let pool = ResourcePool::new(workload.totals().to_vec());
        Simulation::new(
            workload,
            OptimisticManager::new(pool, workload.task_count()),
            SimulationConfig::default(),
        )
    }

    #[test]
    fn test_release_visible_only_after_commit() {
        let workload = scenario_one();
        let mut sim = optimistic(&workload);

        sim.step().unwrap(); // cycle 0: initiates
        sim.step().unwrap(); // cycle 1: 6 granted, 5 blocked
        assert_eq!(sim.tasks()[0].held(ResourceId(0)).unwrap(), 6);
        assert!(sim.tasks()[1].is_blocked());
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 4);

        sim.step().unwrap(); // cycle 2: release; still blocked this cycle
        assert!(sim.tasks()[1].is_blocked());
        assert_eq!(sim.tasks()[1].blocked_cycles(), 2);
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 10);

        sim.step().unwrap(); // cycle 3: granted
        assert_eq!(sim.tasks()[1].held(ResourceId(0)).unwrap(), 5);
        assert!(!sim.tasks()[1].is_blocked());
    }

    #[test]
    fn test_blocked_tasks_dispatch_first() {
        let workload = scenario_one();
        let mut sim = optimistic(&workload);
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(sim.dispatch_order(), vec![1, 0]);
    }

    #[test]
    fn test_run_reports_every_task() {
        let workload = scenario_one();
        let report = optimistic(&workload).run().unwrap();
        assert_eq!(report.policy, Policy::Optimistic);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].terminated_at, Some(3));
        assert_eq!(report.outcomes[1].terminated_at, Some(5));
        assert_eq!(report.outcomes[1].blocked_cycles, 2);
        assert_eq!(report.aborted(), 0);
    }

    #[test]
    fn test_cycle_limit() {
        let workload = scenario_one();
        let config = SimulationBuilder::new().max_cycles(2).build();
        let err = run_policy(&workload, Policy::Optimistic, config).unwrap_err();
        assert_eq!(err, SimError::CycleLimitExceeded { max_cycles: 2 });
    }

    #[test]
    fn test_exhausted_queue_is_an_error() {
        let workload = Workload::builder(&[1]).initiate(0, 0, 1).build().unwrap();
        let err = run_policy(&workload, Policy::Banker, SimulationConfig::default()).unwrap_err();
        assert_eq!(err, SimError::ActionQueueExhausted { task: TaskId(0) });
    }

    #[test]
    fn test_banker_stall_detected() {
        // per-resource safety test admits a cross-resource cycle
        let workload = Workload::builder(&[1, 1])
            .initiate(0, 0, 1)
            .initiate(0, 1, 1)
            .request(0, 0, 0, 1)
            .request(0, 0, 1, 1)
            .terminate(0, 0)
            .initiate(1, 0, 1)
            .initiate(1, 1, 1)
            .request(1, 0, 1, 1)
            .request(1, 0, 0, 1)
            .terminate(1, 0)
            .build()
            .unwrap();
        let err = run_policy(&workload, Policy::Banker, SimulationConfig::default()).unwrap_err();
        assert_eq!(
            err,
            SimError::Stalled {
                cycle: 3,
                blocked: vec![TaskId(0), TaskId(1)],
            }
        );

        // the optimistic policy recovers from the same workload
        let report = run_policy(&workload, Policy::Optimistic, SimulationConfig::default()).unwrap();
        assert!(report.outcomes[0].aborted);
        assert!(!report.outcomes[1].aborted);
    }

    #[test]
    fn test_reset_restarts_run() {
        let workload = scenario_one();
        let mut sim = optimistic(&workload);
        sim.step().unwrap();
        sim.step().unwrap();
        sim.reset();
        assert_eq!(sim.cycle(), 0);
        assert!(sim.log().is_empty());
        assert!(sim.tasks().iter().all(|t| t.cursor() == 0));
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 10);
    }

    #[test]
    fn test_compare_runs_both_policies() {
        let workload = scenario_one();
        let comparison = compare(&workload, SimulationConfig::default()).unwrap();
        assert_eq!(comparison.optimistic.policy, Policy::Optimistic);
        assert_eq!(comparison.banker.policy, Policy::Banker);
        assert!(comparison
            .banker
            .events
            .iter()
            .all(|e| !matches!(e.kind, EventKind::DeadlockDetected { .. })));
    }

    #[test]
    fn test_held_totals() {
        let workload = scenario_one();
        let mut sim = optimistic(&workload);
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(held_totals(sim.tasks(), 1), vec![6]);
        assert!(sim.conserves_units());
    }
}
