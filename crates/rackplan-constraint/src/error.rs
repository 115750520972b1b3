//! Error types for constraints and instances.

use thiserror::Error;

use rackplan_model::{NodeId, VmId};

/// Result type alias for instance checks.
pub type ConstraintResult<T> = Result<T, ConstraintError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("constraint {constraint} references unknown VM {vm}")]
    UnknownVm { constraint: String, vm: VmId },

    #[error("constraint {constraint} references unknown node {node}")]
    UnknownNode { constraint: String, node: NodeId },
}
