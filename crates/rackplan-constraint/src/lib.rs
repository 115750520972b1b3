//! rackplan placement constraints.
//!
//! Constraints restrict the placement or the state of VMs and nodes. The
//! planning core only needs their kind, the elements they involve and
//! their restriction (discrete or continuous); each also knows how to
//! check itself on a model.
//!
//! # Components
//!
//! - **`kind`** — Runtime type tags
//! - **`vm`** — Single-VM constraints (ban, fence, state, …)
//! - **`node`** — Single-node constraints (online, overbook, …)
//! - **`group`** — VM group constraints (among, split, gather, seq, …)
//! - **`capacity`** — Aggregates over node sets
//! - **`instance`** — Model + constraints + objective

pub mod capacity;
pub mod constraint;
pub mod error;
pub mod group;
pub mod instance;
pub mod kind;
pub mod node;
pub mod vm;

pub use capacity::{MaxOnline, RunningCapacity};
pub use constraint::{Constraint, SatConstraint};
pub use error::{ConstraintError, ConstraintResult};
pub use group::{Among, Gather, Lonely, Seq, Split, SplitAmong, Spread};
pub use instance::{Instance, Objective};
pub use kind::ConstraintKind;
pub use node::{Offline, Online, Overbook, Quarantine};
pub use vm::{Ban, Fence, Killed, Preserve, Ready, Root, Running, Sleeping};
