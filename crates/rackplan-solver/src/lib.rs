//! rackplan solving boundary.
//!
//! The partitioning engine treats the solver as a black box: it hands
//! over an instance and gets back an optional plan with statistics. This
//! crate defines that boundary and ships a reference solver able to
//! drive VMs and nodes through their lifecycle.
//!
//! # Components
//!
//! - **`solver`** — `InstanceSolver` trait and solve outcome
//! - **`params`** — Time limit, optimize / repair flags, action durations
//! - **`stats`** — Per-call statistics and their report
//! - **`lifecycle`** — Reference solver based on state and placement goals

pub mod error;
pub mod lifecycle;
pub mod params;
pub mod solver;
pub mod stats;

pub use error::{SolverError, SolverResult};
pub use lifecycle::LifecycleSolver;
pub use params::{DurationSettings, Parameters};
pub use solver::{InstanceSolver, SolveOutcome};
pub use stats::{SolutionStatistics, SolvingStatistics, epoch_ms, write_parameters};
