//! # Structured Event Stream
//!
//! Dispatch never prints. Every state change a manager or the driver makes is
//! described as a [`SimEvent`] (cycle, task, payload) and handed to an
//! [`EventLog`]; rendering is left to whoever consumes the stream.

pub mod event;
pub mod log;

pub use event::{AbortReason, EventBody, EventKind, SimEvent};
pub use log::{EventLog, EventLogConfig, DEFAULT_MAX_EVENTS};
