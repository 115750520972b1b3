//! rackplan static-partitioning runner.
//!
//! Solves a large instance by cutting it into disjoint partitions,
//! solving them concurrently with any `InstanceSolver`, and merging the
//! partition plans and statistics back into one result.
//!
//! # Components
//!
//! - **`config`** — planner.toml loading and scaffolding
//! - **`orchestrator`** — Bounded parallel solving, completion-order collection
//! - **`merge`** — Best-effort plan concatenation
//! - **`stats`** — Aggregated statistics and their report
//! - **`driver`** — `StaticPartitioning`: partition → solve → merge

pub mod config;
pub mod driver;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod stats;

use std::num::NonZeroUsize;

pub use config::{PartitioningConfig, PlannerConfig, ReadyVms, RunnerConfig, StrategyKind};
pub use driver::{PlanningOutcome, StaticPartitioning};
pub use error::{ConfigError, ConfigResult, RunnerError, RunnerResult};
pub use merge::{MergeOutcome, merge};
pub use orchestrator::{Orchestrator, PartitionOutcome};
pub use stats::StaticPartitioningStatistics;

/// Number of workers used when none is configured: the host parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
