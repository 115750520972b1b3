//! Events — side effects attached to an action's hooks.

use std::fmt;

use rackplan_model::{Model, VmId};

use crate::visitor::ActionVisitor;

/// Moment at which the events of a hook are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    /// Before the action's own mutation.
    Pre,
    /// After the action's own mutation.
    Post,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Pre => f.write_str("pre"),
            Hook::Post => f.write_str("post"),
        }
    }
}

/// Set the amount of a resource a VM consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocateEvent {
    pub vm: VmId,
    pub resource: String,
    pub amount: u32,
}

impl AllocateEvent {
    pub fn new(vm: VmId, resource: impl Into<String>, amount: u32) -> Self {
        Self {
            vm,
            resource: resource.into(),
            amount,
        }
    }
}

/// An event. The set is closed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    Allocate(AllocateEvent),
}

impl Event {
    /// Whether [`Event::apply`] would succeed on the model.
    pub fn is_applicable(&self, mo: &Model) -> bool {
        match self {
            Event::Allocate(ev) => mo.resource(&ev.resource).is_some(),
        }
    }

    /// Apply the event. Returns `false`, leaving the model untouched, when
    /// it is not applicable.
    pub fn apply(&self, mo: &mut Model) -> bool {
        match self {
            Event::Allocate(ev) => match mo.resource_mut(&ev.resource) {
                Ok(rc) => {
                    rc.set_consumption(ev.vm, ev.amount);
                    true
                }
                Err(_) => false,
            },
        }
    }

    pub fn accept<V: ActionVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Event::Allocate(ev) => visitor.visit_allocate_event(ev),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Allocate(ev) => write!(
                f,
                "allocate(vm={}, rc={}, amount={})",
                ev.vm, ev.resource, ev.amount
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_model::ShareableResource;

    #[test]
    fn allocate_needs_attached_resource() {
        let mut mo = Model::new();
        let vm = mo.new_vm();
        let ev = Event::Allocate(AllocateEvent::new(vm, "cpu", 3));
        let before = mo.clone();
        assert!(!ev.apply(&mut mo));
        assert_eq!(mo, before);

        mo.attach(ShareableResource::new("cpu")).unwrap();
        assert!(ev.apply(&mut mo));
        assert_eq!(mo.resource("cpu").map(|rc| rc.consumption(vm)), Some(3));
    }
}
