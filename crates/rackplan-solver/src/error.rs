//! Error types for the solving boundary.

use thiserror::Error;

use rackplan_constraint::ConstraintError;
use rackplan_model::{ModelError, VmId};
use rackplan_plan::PlanError;

/// Result type alias for solve calls.
pub type SolverResult<T> = Result<T, SolverError>;

/// Failures of a solve call. Not finding a plan is not an error: it is
/// reported as an outcome without plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("invalid instance: {0}")]
    InvalidInstance(#[from] ConstraintError),

    #[error("VM {0} is not managed by this instance")]
    UnmanagedVm(VmId),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("solver failure: {0}")]
    Internal(String),
}
