//! Workload - Parsed Input Handed to the Core
//!
//! A workload is the resource totals plus one ordered action queue per task.
//! Construction validates every id once, so the engine never sees an action
//! addressing a task or resource type that does not exist.

use super::action::{Action, ActionKind};
use super::error::SimError;
use super::task::Task;
use super::types::{ResourceId, TaskId, Units};
use serde::Serialize;

/// Validated workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workload {
    totals: Vec<Units>,
    queues: Vec<Vec<Action>>,
}

impl Workload {
    /// Group `actions` into per-task queues, preserving their order.
    ///
    /// # Errors
    /// - `TaskOutOfRange`: an action names a task `>= task_count`
    /// - `ResourceOutOfRange`: a non-terminate action names a resource
    ///   `>= totals.len()`
    pub fn new(
        task_count: usize,
        totals: Vec<Units>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<Self, SimError> {
        let resource_count = totals.len();
        let mut queues = vec![Vec::new(); task_count];

        for action in actions {
            let task = action.task();
            let queue = queues
                .get_mut(task.as_usize())
                .ok_or(SimError::TaskOutOfRange { task, task_count })?;

            // TERMINATE carries placeholder resource/amount fields
            if action.kind() != ActionKind::Terminate && action.resource().as_usize() >= resource_count {
                return Err(SimError::ResourceOutOfRange {
                    resource: action.resource(),
                    resource_count,
                });
            }
            queue.push(action);
        }

        Ok(Self { totals, queues })
    }

    /// Start a fluent builder over `totals`
    pub fn builder(totals: &[Units]) -> WorkloadBuilder {
        WorkloadBuilder::new(totals)
    }

    /// Number of tasks
    #[inline]
    pub fn task_count(&self) -> usize {
        self.queues.len()
    }

    /// Number of resource types
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.totals.len()
    }

    /// Units per resource type
    pub fn totals(&self) -> &[Units] {
        &self.totals
    }

    /// Ordered actions of `task`
    pub fn queue(&self, task: TaskId) -> Option<&[Action]> {
        self.queues.get(task.as_usize()).map(Vec::as_slice)
    }

    /// The action `task` is currently working on, if any remain
    pub fn current_action(&self, task: &Task) -> Option<&Action> {
        self.queues
            .get(task.id().as_usize())
            .and_then(|queue| queue.get(task.cursor()))
    }

    /// Fresh, unstarted task state for every task in the workload
    pub fn spawn_tasks(&self) -> Vec<Task> {
        (0..self.task_count())
            .map(|id| Task::new(TaskId(id), self.resource_count()))
            .collect()
    }
}

/// Fluent workload construction for tests, benches and embedding
///
/// ```rust
/// use resalloc_twin::domain::Workload;
///
/// let workload = Workload::builder(&[4])
///     .initiate(0, 0, 4)
///     .request(0, 0, 0, 2)
///     .release(0, 1, 0, 2)
///     .terminate(0, 0)
///     .build()
///     .unwrap();
/// assert_eq!(workload.task_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkloadBuilder {
    totals: Vec<Units>,
    actions: Vec<Action>,
    task_count: usize,
}

impl WorkloadBuilder {
    /// Create a builder over `totals`
    pub fn new(totals: &[Units]) -> Self {
        Self {
            totals: totals.to_vec(),
            actions: Vec::new(),
            task_count: 0,
        }
    }

    /// Reserve at least `count` tasks (tasks are otherwise inferred from actions)
    pub fn tasks(mut self, count: usize) -> Self {
        self.task_count = self.task_count.max(count);
        self
    }

    /// Append an arbitrary action
    pub fn action(mut self, action: Action) -> Self {
        self.task_count = self.task_count.max(action.task().as_usize() + 1);
        self.actions.push(action);
        self
    }

    /// `initiate task resource claim` (0-based ids)
    pub fn initiate(self, task: usize, resource: usize, claim: Units) -> Self {
        self.push(ActionKind::Initiate, task, 0, resource, claim)
    }

    /// `request task delay resource amount` (0-based ids)
    pub fn request(self, task: usize, delay: u32, resource: usize, amount: Units) -> Self {
        self.push(ActionKind::Request, task, delay, resource, amount)
    }

    /// `release task delay resource amount` (0-based ids)
    pub fn release(self, task: usize, delay: u32, resource: usize, amount: Units) -> Self {
        self.push(ActionKind::Release, task, delay, resource, amount)
    }

    /// `terminate task delay` (0-based id)
    pub fn terminate(self, task: usize, delay: u32) -> Self {
        self.push(ActionKind::Terminate, task, delay, 0, 0)
    }

    /// Validate and build
    pub fn build(self) -> Result<Workload, SimError> {
        Workload::new(self.task_count, self.totals, self.actions)
    }

    fn push(self, kind: ActionKind, task: usize, delay: u32, resource: usize, amount: Units) -> Self {
        self.action(Action::new(
            kind,
            TaskId(task),
            delay,
            ResourceId(resource),
            amount,
        ))
    }
}
