//! Run Reports
//!
//! # Text Layout
//!
//! ```text
//!             FIFO
//! Task 1         3     0     0%
//! Task 2       aborted
//! total          3     0     0%
//! ```
//!
//! Columns are the termination cycle, the cycles spent blocked and the
//! blocked share rounded half up. The total row sums non-aborted tasks.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::domain::{Cycle, RunReport, SimEvent, TaskOutcome};

const LABEL_WIDTH: usize = 10;
const COLUMN_WIDTH: usize = 6;

/// Output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// Pretty-printed JSON array of reports
    Json,
}

/// `floor(blocked / total * 100 + 0.5)`, or 0 when `total` is 0
pub fn blocked_percent(blocked: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (blocked * 200 + total) / (total * 2)
}

/// Render `reports` in `format`
///
/// # Errors
/// Only JSON serialization can fail.
pub fn render(format: ReportFormat, reports: &[&RunReport]) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(reports)),
        ReportFormat::Json => render_json(reports),
    }
}

/// One titled table per report, separated by a blank line
pub fn render_text(reports: &[&RunReport]) -> String {
    let mut out = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_table(&mut out, report);
    }
    out
}

fn write_table(out: &mut String, report: &RunReport) {
    let _ = writeln!(
        out,
        "{:>width$}",
        report.policy.report_title(),
        width = LABEL_WIDTH + COLUMN_WIDTH
    );

    for outcome in &report.outcomes {
        let label = outcome.task.to_string();
        if outcome.aborted {
            let _ = writeln!(out, "{label:<LABEL_WIDTH$}{:>9}", "aborted");
        } else {
            write_row(
                out,
                &label,
                u64::from(outcome.terminated_at.unwrap_or(0)),
                u64::from(outcome.blocked_cycles),
            );
        }
    }
    let (cycles, blocked) = totals(&report.outcomes);
    write_row(out, "total", cycles, blocked);
}

fn write_row(out: &mut String, label: &str, cycles: u64, blocked: u64) {
    let _ = writeln!(
        out,
        "{label:<LABEL_WIDTH$}{cycles:>COLUMN_WIDTH$}{blocked:>COLUMN_WIDTH$}{:>w$}%",
        blocked_percent(blocked, cycles),
        w = COLUMN_WIDTH
    );
}

/// Pretty JSON array of the reports
///
/// # Errors
/// Propagates `serde_json` failures.
pub fn render_json(reports: &[&RunReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Event stream grouped under `Cycle N - N+1` headings
pub fn render_trace(events: &[SimEvent]) -> String {
    let mut out = String::new();
    let mut current: Option<Cycle> = None;
    for event in events {
        if current != Some(event.cycle) {
            current = Some(event.cycle);
            let _ = writeln!(out, "Cycle {} - {}", event.cycle, event.cycle + 1);
        }
        let _ = writeln!(out, "  {}", event.body());
    }
    out
}

/// Sum of termination cycles and blocked cycles over non-aborted outcomes
pub fn totals(outcomes: &[TaskOutcome]) -> (u64, u64) {
    outcomes
        .iter()
        .filter(|o| !o.aborted)
        .fold((0, 0), |(cycles, blocked), o| {
            (
                cycles + u64::from(o.terminated_at.unwrap_or(0)),
                blocked + u64::from(o.blocked_cycles),
            )
        })
}
