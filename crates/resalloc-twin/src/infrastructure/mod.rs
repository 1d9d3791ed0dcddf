//! Infrastructure Layer - Workload Input
//!
//! Turns the whitespace-separated workload text into a validated
//! [`Workload`](crate::domain::Workload). Nothing in this layer touches
//! simulation state.

pub mod workload_parser;

pub use workload_parser::{parse_workload, ParseError, MAX_RESOURCE_TYPES, MAX_TASKS};
