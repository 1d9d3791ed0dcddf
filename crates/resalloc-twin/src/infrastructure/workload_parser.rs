//! Workload Text Format
//!
//! ```text
//! T R                         task count, resource type count
//! u1 .. uR                    total units per resource type
//! kind task delay resource amount
//! ...                         one record per action, ids 1-based
//! ```
//!
//! Tokens may be split across lines arbitrarily. Records are grouped per
//! task in file order and converted to 0-based ids. TERMINATE records carry
//! placeholder resource and amount fields that are parsed but not checked.

use crate::domain::{Action, ActionKind, ResourceId, SimError, TaskId, Units, Workload};

/// Largest task count a header may declare
pub const MAX_TASKS: usize = 1 << 16;

/// Largest resource type count a header may declare
pub const MAX_RESOURCE_TYPES: usize = 1 << 16;

/// Workload text rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input ended mid-header or mid-record
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A token that should be a non-negative integer is not one
    #[error("token {position} (`{token}`): expected {expected}")]
    InvalidInteger {
        /// 1-based token position
        position: usize,
        /// Offending token
        token: String,
        /// What the parser was looking for
        expected: &'static str,
    },

    /// Record kind is not one of initiate/request/release/terminate
    #[error("token {position}: unknown action kind `{keyword}`")]
    UnknownActionKind {
        /// 1-based token position
        position: usize,
        /// Offending keyword
        keyword: String,
    },

    /// 1-based task id outside `1..=T`
    #[error("token {position}: task {id} out of range (1..={task_count})")]
    TaskOutOfRange {
        /// 1-based token position
        position: usize,
        /// Id as written
        id: usize,
        /// Declared task count
        task_count: usize,
    },

    /// 1-based resource id outside `1..=R`
    #[error("token {position}: resource {id} out of range (1..={resource_count})")]
    ResourceOutOfRange {
        /// 1-based token position
        position: usize,
        /// Id as written
        id: usize,
        /// Declared resource type count
        resource_count: usize,
    },

    /// Header count above [`MAX_TASKS`] or [`MAX_RESOURCE_TYPES`]
    #[error("token {position}: {field} {value} exceeds the limit of {limit}")]
    HeaderTooLarge {
        /// 1-based token position
        position: usize,
        /// Which header count
        field: &'static str,
        /// Count as written
        value: usize,
        /// Accepted maximum
        limit: usize,
    },

    /// Parsed records failed workload validation
    #[error(transparent)]
    Workload(#[from] SimError),
}

/// Token cursor that remembers positions for diagnostics
struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
            position: 0,
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.inner.next()?;
        self.position += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        self.next().ok_or(ParseError::UnexpectedEof { expected })
    }

    fn count(&mut self, field: &'static str, limit: usize) -> Result<usize, ParseError> {
        let value: usize = self.number(field)?;
        if value > limit {
            return Err(ParseError::HeaderTooLarge {
                position: self.position,
                field,
                value,
                limit,
            });
        }
        Ok(value)
    }

    fn number<N: std::str::FromStr>(&mut self, expected: &'static str) -> Result<N, ParseError> {
        let token = self.expect(expected)?;
        token.parse().map_err(|_| ParseError::InvalidInteger {
            position: self.position,
            token: token.to_owned(),
            expected,
        })
    }
}

/// Parse workload text
///
/// # Errors
/// Any [`ParseError`]; the first problem in token order is reported.
///
/// # Example
///
/// ```rust
/// use resalloc_twin::infrastructure::parse_workload;
///
/// let workload = parse_workload("1 1 4  initiate 1 0 1 4  terminate 1 0 0 0").unwrap();
/// assert_eq!(workload.totals(), &[4]);
/// ```
pub fn parse_workload(input: &str) -> Result<Workload, ParseError> {
    let mut tokens = Tokens::new(input);

    let task_count = tokens.count("task count", MAX_TASKS)?;
    let resource_count = tokens.count("resource type count", MAX_RESOURCE_TYPES)?;
    let mut totals = Vec::with_capacity(resource_count);
    for _ in 0..resource_count {
        totals.push(tokens.number::<Units>("resource total")?);
    }

    let mut actions = Vec::new();
    while let Some(keyword) = tokens.next() {
        let kind: ActionKind = keyword.parse().map_err(|_| ParseError::UnknownActionKind {
            position: tokens.position,
            keyword: keyword.to_owned(),
        })?;

        let task_id: usize = tokens.number("task id")?;
        if task_id == 0 || task_id > task_count {
            return Err(ParseError::TaskOutOfRange {
                position: tokens.position,
                id: task_id,
                task_count,
            });
        }

        let delay: u32 = tokens.number("delay")?;

        let resource_id: usize = tokens.number("resource id")?;
        let resource_position = tokens.position;
        let amount: Units = tokens.number("amount")?;

        let resource = if kind == ActionKind::Terminate {
            ResourceId(resource_id.saturating_sub(1))
        } else if resource_id == 0 || resource_id > resource_count {
            return Err(ParseError::ResourceOutOfRange {
                position: resource_position,
                id: resource_id,
                resource_count,
            });
        } else {
            ResourceId(resource_id - 1)
        };

        actions.push(Action::new(kind, TaskId(task_id - 1), delay, resource, amount));
    }

    tracing::debug!(
        tasks = task_count,
        resources = resource_count,
        actions = actions.len(),
        "workload parsed"
    );
    Ok(Workload::new(task_count, totals, actions)?)
}
