//! rackplan static partitioning.
//!
//! Cuts one large scheduling instance into disjoint sub-instances that
//! can be solved independently: nodes are grouped by a strategy, every
//! VM follows its host, and every constraint is projected onto the
//! partitions it touches by the splitter registered for its kind.
//!
//! # Components
//!
//! - **`strategy`** — Node grouping (explicit sets, fixed count, fixed size)
//! - **`index`** — VM / node → partition tables
//! - **`element_set`** — Element sets split along the index
//! - **`splitter`** — Per-kind constraint projection and its registry
//! - **`partitioner`** — Sub-model carving, constraint routing

pub mod element_set;
pub mod error;
pub mod index;
pub mod partitioner;
pub mod splitter;
pub mod strategy;

pub use element_set::{Partitioned, SplittableElementSet};
pub use error::{PartitionError, PartitionResult, SplitError, SplitResult};
pub use index::{PartitionIndex, Scope};
pub use partitioner::{Partitioner, Partitioning};
pub use splitter::{ConstraintSplitter, SplitOutput, SplitterRegistry};
pub use strategy::{NodeOrder, PartitionStrategy, ReadyVmPolicy};
