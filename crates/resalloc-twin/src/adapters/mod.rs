//! Adapters Layer - Reporting
//!
//! Outbound adapters that turn run results into something a person or
//! another program reads. The domain never formats its own output.

pub mod report;

pub use report::{
    blocked_percent, render, render_json, render_text, render_trace, totals, ReportFormat,
};
