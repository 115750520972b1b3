//! Element identifiers — the opaque handles for VMs and nodes.
//!
//! Identifiers are global to a planning request: a sub-model carved out
//! of a parent model keeps using the parent's identifiers, so an action
//! produced for a partition can be replayed on the parent as-is.

use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VmId(pub u32);

/// Identifier of a physical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vm#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Issues fresh identifiers and remembers every identifier ever declared.
///
/// The registry is what makes sub-models "substitution proof": it is
/// copied whole into every partition, so no partition can hand out an
/// identifier that already exists elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementRegistry {
    vms: BTreeSet<VmId>,
    nodes: BTreeSet<NodeId>,
    next_vm: u32,
    next_node: u32,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next free VM identifier.
    pub fn new_vm(&mut self) -> VmId {
        while self.vms.contains(&VmId(self.next_vm)) {
            self.next_vm += 1;
        }
        let id = VmId(self.next_vm);
        self.vms.insert(id);
        self.next_vm += 1;
        id
    }

    /// Allocate the next free node identifier.
    pub fn new_node(&mut self) -> NodeId {
        while self.nodes.contains(&NodeId(self.next_node)) {
            self.next_node += 1;
        }
        let id = NodeId(self.next_node);
        self.nodes.insert(id);
        self.next_node += 1;
        id
    }

    /// Declare a specific VM identifier. Returns `false` if already taken.
    pub fn declare_vm(&mut self, id: VmId) -> bool {
        self.vms.insert(id)
    }

    /// Declare a specific node identifier. Returns `false` if already taken.
    pub fn declare_node(&mut self, id: NodeId) -> bool {
        self.nodes.insert(id)
    }

    pub fn contains_vm(&self, id: VmId) -> bool {
        self.vms.contains(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms.iter().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}
