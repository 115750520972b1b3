//! Error types for the cluster model.

use thiserror::Error;

use crate::element::{NodeId, VmId};

/// Result type alias for mapping mutations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Reasons a mapping mutation is refused. A refused mutation leaves the
/// mapping untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("node {0} is not online")]
    NodeNotOnline(NodeId),

    #[error("node {0} still hosts VMs")]
    NodeNotEmpty(NodeId),

    #[error("node {0} is not in the mapping")]
    UnknownNode(NodeId),

    #[error("VM {0} is not in the mapping")]
    UnknownVm(VmId),
}

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or restricting a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("resource {0} is not attached to the model")]
    UnknownResource(String),

    #[error("resource {0} is already attached to the model")]
    DuplicateResource(String),

    #[error("node {0} is not declared in the model")]
    UndeclaredNode(NodeId),

    #[error("VM {0} is not declared in the model")]
    UndeclaredVm(VmId),

    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
}
