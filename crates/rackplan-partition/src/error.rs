//! Partitioning error types.
//!
//! Every error here is a configuration error: it is raised before any
//! partition is solved.

use thiserror::Error;

use rackplan_constraint::ConstraintKind;
use rackplan_model::{ModelError, NodeId, VmId};

/// Errors raised while cutting an instance into partitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("overlapping partitions: {total} node slot(s) for {distinct} distinct node(s)")]
    Overlapping { total: usize, distinct: usize },

    #[error("node {0} is not part of the model")]
    UnknownNode(NodeId),

    #[error("partition size must be positive")]
    ZeroSize,

    #[error("partition count must be positive")]
    ZeroCount,

    #[error("{0}")]
    Split(#[from] SplitError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

pub type PartitionResult<T> = Result<T, PartitionError>;

/// Errors raised while projecting a constraint onto partitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("no splitter registered for '{0}' constraints")]
    Unregistered(ConstraintKind),

    #[error("unable to split {constraint}: {reason}")]
    Unsupported { constraint: String, reason: String },

    #[error("{constraint} is anchored on {vm}, which belongs to no partition")]
    UnassignedVm { constraint: String, vm: VmId },

    #[error("{constraint} is anchored on {node}, which belongs to no partition")]
    UnassignedNode { constraint: String, node: NodeId },

    #[error("splitter for '{expected}' received {constraint}")]
    Mismatch {
        expected: ConstraintKind,
        constraint: String,
    },
}

pub type SplitResult<T> = Result<T, SplitError>;
