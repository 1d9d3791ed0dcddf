//! Simulation Event Definitions
//!
//! Each event is self-contained: the cycle, the task it concerns (if any) and
//! a payload carrying every number the human-readable line needs, so a
//! renderer never has to look back into simulation state.

use crate::domain::types::{Cycle, ResourceId, TaskId, Units};
use serde::Serialize;
use std::fmt;

/// Why a policy aborted a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// Banker: INITIATE claim larger than the resource's capacity
    ClaimExceedsTotal {
        /// Resource type claimed
        resource: ResourceId,
        /// Declared claim
        claim: Units,
        /// Capacity of the resource type
        total: Units,
    },
    /// Banker: REQUEST would take the task beyond its claim
    RequestExceedsClaim {
        /// Resource type requested
        resource: ResourceId,
        /// Units requested
        requested: Units,
        /// Units already held
        held: Units,
        /// Declared claim
        claim: Units,
    },
    /// Optimistic: chosen to break a deadlock
    DeadlockVictim,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ClaimExceedsTotal {
                resource,
                claim,
                total,
            } => write!(
                f,
                "claim for {resource} ({claim}) exceeds number of units present ({total})"
            ),
            AbortReason::RequestExceedsClaim {
                resource,
                requested,
                held,
                claim,
            } => write!(
                f,
                "request for {requested} of {resource} while holding {held} exceeds claim {claim}"
            ),
            AbortReason::DeadlockVictim => write!(f, "aborted to break a deadlock"),
        }
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// INITIATE applied
    Initiated {
        /// Resource type claimed
        resource: ResourceId,
        /// Declared claim
        claim: Units,
    },
    /// Task spent a cycle computing before its action applies
    Computing {
        /// Cycles computed so far
        progress: u32,
        /// Cycles required
        of: u32,
    },
    /// REQUEST granted
    Granted {
        /// Resource type granted
        resource: ResourceId,
        /// Units granted
        amount: Units,
        /// Units held afterwards
        held: Units,
    },
    /// REQUEST refused for now
    Blocked {
        /// Resource type requested
        resource: ResourceId,
        /// Units requested
        requested: Units,
        /// Units available when refused
        available: Units,
    },
    /// RELEASE applied (visible from the next cycle)
    Released {
        /// Resource type released
        resource: ResourceId,
        /// Units released
        amount: Units,
        /// Units held afterwards
        held: Units,
    },
    /// TERMINATE applied
    Terminated {
        /// Units still held at termination, returned to the pool
        returned: Vec<(ResourceId, Units)>,
    },
    /// Task aborted by a policy
    Aborted {
        /// Why
        reason: AbortReason,
        /// Units returned to the pool
        returned: Vec<(ResourceId, Units)>,
    },
    /// Every live task was blocked after a dispatch pass
    DeadlockDetected {
        /// The blocked tasks
        blocked: Vec<TaskId>,
    },
    /// Pending releases became available at the cycle boundary
    Committed {
        /// Resource type
        resource: ResourceId,
        /// Units made available
        units: Units,
    },
}

/// One entry of the structured event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimEvent {
    /// Cycle in which the event happened
    pub cycle: Cycle,
    /// Task concerned, `None` for pool-wide events
    pub task: Option<TaskId>,
    /// Payload
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SimEvent {
    /// Event concerning `task`
    pub const fn task(cycle: Cycle, task: TaskId, kind: EventKind) -> Self {
        Self {
            cycle,
            task: Some(task),
            kind,
        }
    }

    /// Pool-wide event
    pub const fn global(cycle: Cycle, kind: EventKind) -> Self {
        Self {
            cycle,
            task: None,
            kind,
        }
    }

    /// The line without its `[c-c+1]` cycle prefix
    pub const fn body(&self) -> EventBody<'_> {
        EventBody(self)
    }
}

/// Task and payload of a [`SimEvent`], rendered without the cycle
#[derive(Debug, Clone, Copy)]
pub struct EventBody<'a>(&'a SimEvent);

impl fmt::Display for EventBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.task {
            Some(task) => write!(f, "{task} {}", self.0.kind),
            None => write!(f, "{}", self.0.kind),
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}] {}", self.cycle, self.cycle + 1, self.body())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Initiated { resource, claim } => {
                write!(f, "was initiated with claim {claim} of {resource}")
            }
            EventKind::Computing { progress, of } => {
                write!(f, "is computing ({progress} of {of} cycles)")
            }
            EventKind::Granted {
                resource,
                amount,
                held,
            } => write!(
                f,
                "was granted {amount} of {resource}; it now holds {held}"
            ),
            EventKind::Blocked {
                resource,
                requested,
                available,
            } => write!(
                f,
                "could not be granted {requested} of {resource} ({available} available)"
            ),
            EventKind::Released {
                resource,
                amount,
                held,
            } => write!(
                f,
                "is releasing {amount} of {resource}; it now holds {held}"
            ),
            EventKind::Terminated { returned } => {
                write!(f, "is terminated")?;
                write_returned(f, returned)
            }
            EventKind::Aborted { reason, returned } => {
                write!(f, "is aborted: {reason}")?;
                write_returned(f, returned)
            }
            EventKind::DeadlockDetected { blocked } => {
                write!(f, "deadlock detected among ")?;
                for (i, task) in blocked.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{task}")?;
                }
                Ok(())
            }
            EventKind::Committed { resource, units } => {
                write!(f, "{units} unit(s) of {resource} available from next cycle")
            }
        }
    }
}

fn write_returned(f: &mut fmt::Formatter<'_>, returned: &[(ResourceId, Units)]) -> fmt::Result {
    if returned.is_empty() {
        return Ok(());
    }
    write!(f, " (returning ")?;
    for (i, (resource, units)) in returned.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{units} of {resource}")?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_line() {
        let event = SimEvent::task(
            1,
            TaskId(0),
            EventKind::Granted {
                resource: ResourceId(0),
                amount: 6,
                held: 6,
            },
        );
        assert_eq!(
            event.to_string(),
            "[1-2] Task 1 was granted 6 of resource 1; it now holds 6"
        );
    }

    #[test]
    fn test_abort_line_lists_returned_units() {
        let event = SimEvent::task(
            3,
            TaskId(1),
            EventKind::Aborted {
                reason: AbortReason::DeadlockVictim,
                returned: vec![(ResourceId(0), 1), (ResourceId(1), 2)],
            },
        );
        assert_eq!(
            event.to_string(),
            "[3-4] Task 2 is aborted: aborted to break a deadlock \
             (returning 1 of resource 1, 2 of resource 2)"
        );
    }

    #[test]
    fn test_global_event_has_no_task() {
        let event = SimEvent::global(
            0,
            EventKind::DeadlockDetected {
                blocked: vec![TaskId(0), TaskId(1)],
            },
        );
        assert_eq!(event.task, None);
        assert_eq!(
            event.to_string(),
            "[0-1] deadlock detected among Task 1, Task 2"
        );
    }

    #[test]
    fn test_body_omits_cycle_prefix() {
        let granted = SimEvent::task(
            7,
            TaskId(2),
            EventKind::Released {
                resource: ResourceId(1),
                amount: 2,
                held: 0,
            },
        );
        assert_eq!(
            granted.body().to_string(),
            "Task 3 is releasing 2 of resource 2; it now holds 0"
        );

        let committed = SimEvent::global(
            7,
            EventKind::Committed {
                resource: ResourceId(0),
                units: 3,
            },
        );
        assert_eq!(
            committed.body().to_string(),
            "3 unit(s) of resource 1 available from next cycle"
        );
        assert_eq!(
            committed.kind.to_string(),
            committed.body().to_string()
        );
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = SimEvent::task(
            2,
            TaskId(0),
            EventKind::Computing { progress: 1, of: 2 },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["cycle"], 2);
        assert_eq!(json["task"], 0);
        assert_eq!(json["event"], "computing");
        assert_eq!(json["progress"], 1);
    }
}
