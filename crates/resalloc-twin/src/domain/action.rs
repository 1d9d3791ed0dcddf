//! Actions - Immutable Workload Steps
//!
//! An [`Action`] never changes after construction. Tasks do not hold a
//! reference to their current action; the driver resolves it through the
//! task's cursor into the workload's per-task queue (see
//! [`Workload::current_action`](super::Workload::current_action)).

use super::types::{ResourceId, TaskId, Units};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a workload action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Declare a claim on one resource type
    Initiate,
    /// Ask for units of one resource type
    Request,
    /// Give back units of one resource type
    Release,
    /// Finish the task
    Terminate,
}

impl ActionKind {
    /// Keyword used by the workload text format
    pub const fn keyword(self) -> &'static str {
        match self {
            ActionKind::Initiate => "initiate",
            ActionKind::Request => "request",
            ActionKind::Release => "release",
            ActionKind::Terminate => "terminate",
        }
    }

    /// Whether the action's delay is honored before its effect applies.
    ///
    /// INITIATE is applied on its first dispatch regardless of delay.
    #[inline(always)]
    pub const fn honors_delay(self) -> bool {
        !matches!(self, ActionKind::Initiate)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Error returned when a keyword is not a known action kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action kind `{0}`")]
pub struct UnknownActionKind(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiate" => Ok(ActionKind::Initiate),
            "request" => Ok(ActionKind::Request),
            "release" => Ok(ActionKind::Release),
            "terminate" => Ok(ActionKind::Terminate),
            other => Err(UnknownActionKind(other.to_owned())),
        }
    }
}

/// One step of a task's workload
///
/// `delay` is the number of cycles the task spends computing before the
/// effect applies; an action with delay `d` therefore occupies `d + 1`
/// dispatches when it is never blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    kind: ActionKind,
    task: TaskId,
    resource: ResourceId,
    amount: Units,
    delay: u32,
}

impl Action {
    /// Create a new action
    pub const fn new(
        kind: ActionKind,
        task: TaskId,
        delay: u32,
        resource: ResourceId,
        amount: Units,
    ) -> Self {
        Self {
            kind,
            task,
            resource,
            amount,
            delay,
        }
    }

    /// Action kind
    #[inline(always)]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Owning task
    #[inline(always)]
    pub const fn task(&self) -> TaskId {
        self.task
    }

    /// Target resource type
    #[inline(always)]
    pub const fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Units claimed, requested or released
    #[inline(always)]
    pub const fn amount(&self) -> Units {
        self.amount
    }

    /// Compute cycles before the effect applies
    #[inline(always)]
    pub const fn delay(&self) -> u32 {
        self.delay
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.kind,
            self.task.as_usize() + 1,
            self.delay,
            self.resource.as_usize() + 1,
            self.amount
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keyword_parses_back() {
        for kind in [
            ActionKind::Initiate,
            ActionKind::Request,
            ActionKind::Release,
            ActionKind::Terminate,
        ] {
            assert_eq!(kind.keyword().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = "acquire".parse::<ActionKind>().unwrap_err();
        assert_eq!(err, UnknownActionKind("acquire".into()));
    }

    #[test]
    fn test_only_initiate_ignores_delay() {
        assert!(!ActionKind::Initiate.honors_delay());
        assert!(ActionKind::Request.honors_delay());
        assert!(ActionKind::Release.honors_delay());
        assert!(ActionKind::Terminate.honors_delay());
    }

    #[test]
    fn test_display_uses_text_format() {
        let action = Action::new(ActionKind::Request, TaskId(1), 3, ResourceId(0), 4);
        assert_eq!(action.to_string(), "request 2 3 1 4");
    }
}
