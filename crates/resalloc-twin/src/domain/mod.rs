//! Domain Layer - Simulation Core
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Values                        State                        │
//! │  ├─ TaskId / ResourceId        ├─ Task (lifecycle)          │
//! │  ├─ Action / ActionKind        └─ ResourcePool (ledger)     │
//! │  └─ Workload                                                │
//! │                                                             │
//! │                   Manager Module                            │
//! │                   ├─ ResourceManager (trait)                │
//! │                   ├─ OptimisticManager                      │
//! │                   └─ BankerManager                          │
//! │                                                             │
//! │                   Simulation Module                         │
//! │                   ├─ Simulation<M> (cycle loop)             │
//! │                   └─ run_policy / compare                   │
//! │                                                             │
//! │                   Trace Module                              │
//! │                   ├─ SimEvent / EventKind                   │
//! │                   └─ EventLog                               │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is single-threaded and deterministic: identical
//! workloads and configuration produce identical reports and event streams.

pub mod action;
pub mod error;
pub mod manager;
pub mod pool;
pub mod simulation;
pub mod task;
pub mod trace;
pub mod types;
pub mod workload;

pub use action::{Action, ActionKind, UnknownActionKind};
pub use error::SimError;
pub use manager::{detect_deadlock, BankerManager, DispatchOutcome, OptimisticManager, ResourceManager};
pub use pool::ResourcePool;
pub use simulation::{
    compare, held_totals, run_policy, Comparison, RunReport, Simulation, SimulationBuilder,
    SimulationConfig, DEFAULT_MAX_CYCLES,
};
pub use task::{Lifecycle, Task, TaskOutcome};
pub use trace::{AbortReason, EventBody, EventKind, EventLog, EventLogConfig, SimEvent, DEFAULT_MAX_EVENTS};
pub use types::{Cycle, Policy, ResourceId, TaskId, Units};
pub use workload::{Workload, WorkloadBuilder};
