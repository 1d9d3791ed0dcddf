use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use resalloc_twin::adapters::{render, render_trace, ReportFormat};
use resalloc_twin::domain::{
    compare, run_policy, Policy, RunReport, SimulationBuilder, Workload, DEFAULT_MAX_CYCLES,
};
use resalloc_twin::infrastructure::parse_workload;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resource allocation simulator
/// Runs one workload under the optimistic and the banker policy
#[derive(Debug, Parser)]
#[command(name = "resalloc", version)]
#[command(about = "Compare optimistic and banker resource managers", long_about = None)]
struct Cli {
    /// Workload file
    #[arg(default_value = "./data/input-01.txt")]
    input: PathBuf,

    /// Policy to simulate
    #[arg(short, long, value_enum, default_value_t = PolicyArg::Both)]
    policy: PolicyArg,

    /// Output encoding
    #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Include the per-cycle event trace
    #[arg(short, long)]
    trace: bool,

    /// Give up after this many cycles
    #[arg(long, env = "RESALLOC_MAX_CYCLES", default_value_t = DEFAULT_MAX_CYCLES)]
    max_cycles: u32,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Optimistic,
    Banker,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<Workload> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to open {} for input", path.display()))?;
    parse_workload(&text).with_context(|| format!("invalid workload in {}", path.display()))
}

fn simulate(cli: &Cli, workload: &Workload) -> Result<Vec<RunReport>> {
    let config = SimulationBuilder::new()
        .max_cycles(cli.max_cycles)
        .record_events(cli.trace)
        .build();

    let reports = match cli.policy {
        PolicyArg::Both => {
            let comparison = compare(workload, config)?;
            vec![comparison.optimistic, comparison.banker]
        }
        PolicyArg::Optimistic => vec![run_policy(workload, Policy::Optimistic, config)?],
        PolicyArg::Banker => vec![run_policy(workload, Policy::Banker, config)?],
    };
    Ok(reports)
}

fn execute(cli: &Cli) -> Result<String> {
    let workload = load(&cli.input)?;
    info!(
        input = %cli.input.display(),
        tasks = workload.task_count(),
        resources = workload.resource_count(),
        "workload loaded"
    );

    let reports = simulate(cli, &workload).context("simulation failed")?;
    let refs: Vec<&RunReport> = reports.iter().collect();
    let format = ReportFormat::from(cli.format);

    let mut out = String::new();
    if cli.trace && format == ReportFormat::Text {
        for report in &reports {
            out.push_str(&format!("{} trace\n", report.policy.report_title()));
            out.push_str(&render_trace(&report.events));
            out.push('\n');
        }
    }
    out.push_str(&render(format, &refs).context("failed to encode report")?);
    Ok(out)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = execute(&cli)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
