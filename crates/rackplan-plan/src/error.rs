//! Error types for actions and plans.

use thiserror::Error;

/// Result type alias for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("invalid action window [{start}, {end}]: start is after end")]
    InvalidWindow { start: u32, end: u32 },

    #[error("action #{index} ({action}) is not applicable during replay")]
    NotApplicable { index: usize, action: String },
}
