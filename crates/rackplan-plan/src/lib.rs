//! rackplan actions and reconfiguration plans.
//!
//! An action is a timed operation with a precondition over the cluster
//! model; applying it either performs exactly the transition it declares
//! or does nothing. A plan collects the actions a solver produced for one
//! origin model and can replay them.
//!
//! # Components
//!
//! - **`action`** — Operations, state transitions, `apply`
//! - **`event`** — Hook events (resource allocation)
//! - **`visitor`** — Double dispatch over the closed action set
//! - **`plan`** — Plan container, replay
//! - **`dependencies`** — Demanding / freeing classification
//! - **`durations`** — Per-kind durations, transition counts

pub mod action;
pub mod dependencies;
pub mod durations;
pub mod error;
pub mod event;
pub mod plan;
pub mod visitor;

pub use action::{
    Action, ActionKind, Allocate, BootNode, BootVm, ForgeVm, KillVm, MigrateVm, NodeTransition,
    Operation, ResumeVm, ShutdownNode, ShutdownVm, SuspendVm, VmTransition,
};
pub use dependencies::{DependenciesExtractor, Footprint};
pub use durations::{ActionDurations, TransitionCounter};
pub use error::{PlanError, PlanResult};
pub use event::{AllocateEvent, Event, Hook};
pub use plan::Plan;
pub use visitor::ActionVisitor;
