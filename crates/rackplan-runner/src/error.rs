//! Runner error types.

use std::path::PathBuf;

use thiserror::Error;

use rackplan_partition::PartitionError;
use rackplan_solver::SolverError;

/// Errors of a static-partitioning run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The instance could not be partitioned. Nothing was solved.
    #[error("partitioning failed: {0}")]
    Partition(#[from] PartitionError),

    #[error("partition {partition}: {source}")]
    Solver {
        partition: usize,
        #[source]
        source: SolverError,
    },

    #[error("partition {partition}: solving task failed: {reason}")]
    TaskFailed { partition: usize, reason: String },

    #[error("worker pool failure: {0}")]
    Pool(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors raised while loading a planner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid [{section}] section: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
