//! Constraints anchored on a single VM.

use std::collections::BTreeSet;
use std::fmt;

use rackplan_model::{Model, NodeId, VmId};

use crate::constraint::{SatConstraint, fmt_restriction, fmt_set};
use crate::kind::ConstraintKind;

/// The VM must not run on any of the nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ban {
    pub vm: VmId,
    pub nodes: BTreeSet<NodeId>,
    pub continuous: bool,
}

impl Ban {
    pub fn new(vm: VmId, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            vm,
            nodes: nodes.into_iter().collect(),
            continuous: false,
        }
    }
}

impl SatConstraint for Ban {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Ban
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::from([self.vm])
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes.clone()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        match mo.mapping().vm_location(self.vm) {
            Some(host) if mo.mapping().is_running(self.vm) => !self.nodes.contains(&host),
            _ => true,
        }
    }
}

impl fmt::Display for Ban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ban(vm={}, nodes=", self.vm)?;
        fmt_set(f, &self.nodes)?;
        fmt_restriction(f, self.continuous)
    }
}

/// The VM may only run on the nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub vm: VmId,
    pub nodes: BTreeSet<NodeId>,
    pub continuous: bool,
}

impl Fence {
    pub fn new(vm: VmId, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            vm,
            nodes: nodes.into_iter().collect(),
            continuous: false,
        }
    }
}

impl SatConstraint for Fence {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Fence
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::from([self.vm])
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes.clone()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        match mo.mapping().vm_location(self.vm) {
            Some(host) if mo.mapping().is_running(self.vm) => self.nodes.contains(&host),
            _ => true,
        }
    }
}

impl fmt::Display for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fence(vm={}, nodes=", self.vm)?;
        fmt_set(f, &self.nodes)?;
        fmt_restriction(f, self.continuous)
    }
}

/// A running VM must be granted at least `amount` of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preserve {
    pub vm: VmId,
    pub resource: String,
    pub amount: u32,
}

impl Preserve {
    pub fn new(vm: VmId, resource: impl Into<String>, amount: u32) -> Self {
        Self {
            vm,
            resource: resource.into(),
            amount,
        }
    }
}

impl SatConstraint for Preserve {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Preserve
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::from([self.vm])
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        if !mo.mapping().is_running(self.vm) {
            return true;
        }
        mo.resource(&self.resource)
            .is_some_and(|rc| rc.consumption(self.vm) >= self.amount)
    }
}

impl fmt::Display for Preserve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preserve(vm={}, rc={}, amount={}, discrete)",
            self.vm, self.resource, self.amount
        )
    }
}

/// The VM must not be relocated.
///
/// The restriction is about the path, not the destination, so the
/// discrete check on a single model always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub vm: VmId,
}

impl SatConstraint for Root {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Root
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::from([self.vm])
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn is_satisfied(&self, _: &Model) -> bool {
        true
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root(vm={}, continuous)", self.vm)
    }
}

/// State constraints: the VM must end in the given state.
macro_rules! vm_state_constraint {
    ($(#[$doc:meta])* $name:ident, $kind:ident, $label:literal, |$m:ident, $vm:ident| $check:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub vm: VmId,
        }

        impl SatConstraint for $name {
            fn kind(&self) -> ConstraintKind {
                ConstraintKind::$kind
            }

            fn involved_vms(&self) -> BTreeSet<VmId> {
                BTreeSet::from([self.vm])
            }

            fn involved_nodes(&self) -> BTreeSet<NodeId> {
                BTreeSet::new()
            }

            fn is_continuous(&self) -> bool {
                false
            }

            fn is_satisfied(&self, mo: &Model) -> bool {
                let $m = mo.mapping();
                let $vm = self.vm;
                $check
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "(vm={}, discrete)"), self.vm)
            }
        }
    };
}

vm_state_constraint!(
    /// The VM must be running.
    Running, Running, "running", |m, vm| m.is_running(vm)
);
vm_state_constraint!(
    /// The VM must be ready.
    Ready, Ready, "ready", |m, vm| m.is_ready(vm)
);
vm_state_constraint!(
    /// The VM must be sleeping.
    Sleeping, Sleeping, "sleeping", |m, vm| m.is_sleeping(vm)
);
vm_state_constraint!(
    /// The VM must be terminated.
    Killed, Killed, "killed", |m, vm| !m.contains_vm(vm)
);

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_model::ShareableResource;

    fn model() -> (Model, NodeId, NodeId, VmId, VmId) {
        let mut mo = Model::new();
        let (n0, n1) = (mo.new_node(), mo.new_node());
        let (v0, v1) = (mo.new_vm(), mo.new_vm());
        let m = mo.mapping_mut();
        m.add_online_node(n0).unwrap();
        m.add_online_node(n1).unwrap();
        m.add_running_vm(v0, n0).unwrap();
        m.add_sleeping_vm(v1, n1).unwrap();
        (mo, n0, n1, v0, v1)
    }

    #[test]
    fn ban_and_fence_only_look_at_running_vms() {
        let (mo, n0, n1, v0, v1) = model();
        assert!(!Ban::new(v0, [n0]).is_satisfied(&mo));
        assert!(Ban::new(v0, [n1]).is_satisfied(&mo));
        assert!(Ban::new(v1, [n1]).is_satisfied(&mo));
        assert!(Fence::new(v0, [n0]).is_satisfied(&mo));
        assert!(!Fence::new(v0, [n1]).is_satisfied(&mo));
        assert!(Fence::new(v1, [n0]).is_satisfied(&mo));
    }

    #[test]
    fn state_constraints() {
        let (mo, _, _, v0, v1) = model();
        assert!(Running { vm: v0 }.is_satisfied(&mo));
        assert!(!Running { vm: v1 }.is_satisfied(&mo));
        assert!(Sleeping { vm: v1 }.is_satisfied(&mo));
        assert!(!Ready { vm: v0 }.is_satisfied(&mo));
        assert!(Killed { vm: VmId(7) }.is_satisfied(&mo));
        assert_eq!(Killed { vm: v0 }.to_string(), "killed(vm=vm#0, discrete)");
    }

    #[test]
    fn preserve_needs_the_resource() {
        let (mut mo, _, _, v0, _) = model();
        let p = Preserve::new(v0, "cpu", 2);
        assert!(!p.is_satisfied(&mo));
        let mut rc = ShareableResource::new("cpu");
        rc.set_consumption(v0, 2);
        mo.attach(rc).unwrap();
        assert!(p.is_satisfied(&mo));
    }

    #[test]
    fn display_lists_the_node_set() {
        let c = Ban::new(VmId(0), [NodeId(2), NodeId(1)]);
        assert_eq!(c.to_string(), "ban(vm=vm#0, nodes={node#1, node#2}, discrete)");
    }
}
