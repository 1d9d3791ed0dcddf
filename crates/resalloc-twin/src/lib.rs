//! Resource Allocation Twin
//!
//! # Overview
//!
//! `resalloc-twin` is a deterministic, cycle-driven simulator of tasks
//! competing for a fixed pool of reusable resource types. The same workload
//! runs under two deadlock-handling policies so their throughput and
//! blocking cost can be compared:
//!
//! - **Optimistic**: grant whenever units are available, detect deadlock
//!   after the fact and abort the lowest-id task until progress is possible.
//! - **Banker**: admit a request only when the pool can still cover the
//!   task's whole remaining claim, so honest workloads never deadlock.
//!
//! # Layered Architecture
//!
//! - **Domain**: tasks, the pool ledger, both managers and the cycle loop
//! - **Infrastructure**: the textual workload format
//! - **Adapters**: text and JSON reports
//!
//! # Invariants
//!
//! - **Conservation**: at every commit boundary,
//!   `available[r] + Σ held[r] == total[r]`.
//! - **Deferred visibility**: a unit released in cycle N cannot be granted
//!   before cycle N+1.
//! - **Victim determinism**: recovery aborts the lowest-id live task first.
//! - **Admission soundness**: a Banker grant never overdraws the pool, and a
//!   claim above capacity aborts before any unit moves.
//!
//! # Usage
//!
//! ```rust
//! use resalloc_twin::domain::{compare, SimulationConfig, Workload};
//!
//! let workload = Workload::builder(&[10])
//!     .initiate(0, 0, 10)
//!     .request(0, 0, 0, 6)
//!     .release(0, 0, 0, 6)
//!     .terminate(0, 0)
//!     .initiate(1, 0, 10)
//!     .request(1, 0, 0, 5)
//!     .release(1, 0, 0, 5)
//!     .terminate(1, 0)
//!     .build()
//!     .unwrap();
//!
//! let comparison = compare(&workload, SimulationConfig::default()).unwrap();
//! assert_eq!(comparison.optimistic.outcomes[1].blocked_cycles, 2);
//! assert_eq!(comparison.banker.aborted(), 0);
//! ```
//!
//! # Verification
//!
//! Pool proofs run under Kani (`cargo kani`); they are compiled only with
//! `cfg(kani)`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// Layers
pub mod domain;
pub mod infrastructure;
pub mod adapters;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Re-export Primary Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Values
pub use domain::{Action, ActionKind, Cycle, Policy, ResourceId, TaskId, Units, Workload};

// Engine
pub use domain::{
    compare, run_policy, BankerManager, Comparison, OptimisticManager, ResourceManager,
    RunReport, SimError, Simulation, SimulationConfig,
};

// Events
pub use domain::{AbortReason, EventKind, EventLog, SimEvent};

// Edges
pub use adapters::{render_json, render_text, ReportFormat};
pub use infrastructure::{parse_workload, ParseError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
