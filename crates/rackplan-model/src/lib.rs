//! rackplan cluster model.
//!
//! A model is a snapshot of a cluster: which nodes are online, where each
//! VM lives and in which lifecycle state, and how much of each shareable
//! resource nodes offer and VMs consume. Every other rackplan crate reads
//! or mutates this model.
//!
//! # Components
//!
//! - **`element`** — VM and node identifiers, identifier registry
//! - **`mapping`** — VM states and placements, node states
//! - **`resource`** — Shareable resource views (capacity / consumption)
//! - **`model`** — The snapshot tying them together, sub-model carving

pub mod element;
pub mod error;
pub mod mapping;
pub mod model;
pub mod resource;

pub use element::{ElementRegistry, NodeId, VmId};
pub use error::{MappingError, MappingResult, ModelError, ModelResult};
pub use mapping::{Mapping, NodeState, VmState, VmStateKind};
pub use model::Model;
pub use resource::ShareableResource;
