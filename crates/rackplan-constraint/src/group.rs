//! Constraints over groups of VMs.

use std::collections::BTreeSet;
use std::fmt;

use rackplan_model::{Mapping, Model, NodeId, VmId};

use crate::constraint::{SatConstraint, fmt_groups, fmt_restriction, fmt_set};
use crate::kind::ConstraintKind;

/// Hosts of the running VMs among `vms`.
fn running_hosts<'a>(m: &Mapping, vms: impl IntoIterator<Item = &'a VmId>) -> BTreeSet<NodeId> {
    vms.into_iter()
        .filter(|vm| m.is_running(**vm))
        .filter_map(|vm| m.vm_location(*vm))
        .collect()
}

fn union<T: Ord + Copy>(groups: &[BTreeSet<T>]) -> BTreeSet<T> {
    groups.iter().flatten().copied().collect()
}

// ── Among ─────────────────────────────────────────────────────────

/// The running VMs must all be hosted inside a single one of the node
/// groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Among {
    pub vms: BTreeSet<VmId>,
    pub groups: Vec<BTreeSet<NodeId>>,
    pub continuous: bool,
}

impl Among {
    pub fn new(vms: impl IntoIterator<Item = VmId>, groups: Vec<BTreeSet<NodeId>>) -> Self {
        Self {
            vms: vms.into_iter().collect(),
            groups,
            continuous: false,
        }
    }
}

impl SatConstraint for Among {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Among
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        self.vms.clone()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        union(&self.groups)
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let hosts = running_hosts(mo.mapping(), &self.vms);
        hosts.is_empty() || self.groups.iter().any(|g| hosts.is_subset(g))
    }
}

impl fmt::Display for Among {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "among(vms=")?;
        fmt_set(f, &self.vms)?;
        write!(f, ", nodes=")?;
        fmt_groups(f, &self.groups)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── Split ─────────────────────────────────────────────────────────

/// Running VMs of distinct groups must never share a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub groups: Vec<BTreeSet<VmId>>,
    pub continuous: bool,
}

impl Split {
    pub fn new(groups: Vec<BTreeSet<VmId>>) -> Self {
        Self {
            groups,
            continuous: false,
        }
    }
}

impl SatConstraint for Split {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Split
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        union(&self.groups)
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        for g in &self.groups {
            let hosts = running_hosts(mo.mapping(), g);
            if !hosts.is_disjoint(&seen) {
                return false;
            }
            seen.extend(hosts);
        }
        true
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "split(vms=")?;
        fmt_groups(f, &self.groups)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── SplitAmong ────────────────────────────────────────────────────

/// Each VM group must run inside one node group, and distinct VM groups
/// inside distinct node groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAmong {
    pub vm_groups: Vec<BTreeSet<VmId>>,
    pub node_groups: Vec<BTreeSet<NodeId>>,
    pub continuous: bool,
}

impl SplitAmong {
    pub fn new(vm_groups: Vec<BTreeSet<VmId>>, node_groups: Vec<BTreeSet<NodeId>>) -> Self {
        Self {
            vm_groups,
            node_groups,
            continuous: false,
        }
    }
}

impl SatConstraint for SplitAmong {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::SplitAmong
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        union(&self.vm_groups)
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        union(&self.node_groups)
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let mut used: BTreeSet<usize> = BTreeSet::new();
        for g in &self.vm_groups {
            let hosts = running_hosts(mo.mapping(), g);
            if hosts.is_empty() {
                continue;
            }
            let Some(idx) = self.node_groups.iter().position(|ng| hosts.is_subset(ng)) else {
                return false;
            };
            if !used.insert(idx) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for SplitAmong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "splitAmong(vms=")?;
        fmt_groups(f, &self.vm_groups)?;
        write!(f, ", nodes=")?;
        fmt_groups(f, &self.node_groups)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── Spread ────────────────────────────────────────────────────────

/// The running VMs must be on pairwise distinct nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spread {
    pub vms: BTreeSet<VmId>,
    pub continuous: bool,
}

impl Spread {
    pub fn new(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self {
            vms: vms.into_iter().collect(),
            continuous: true,
        }
    }
}

impl SatConstraint for Spread {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Spread
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        self.vms.clone()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let m = mo.mapping();
        let mut seen = BTreeSet::new();
        self.vms
            .iter()
            .filter(|vm| m.is_running(**vm))
            .filter_map(|vm| m.vm_location(*vm))
            .all(|host| seen.insert(host))
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spread(vms=")?;
        fmt_set(f, &self.vms)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── Gather ────────────────────────────────────────────────────────

/// The running VMs must all share one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub vms: BTreeSet<VmId>,
    pub continuous: bool,
}

impl Gather {
    pub fn new(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self {
            vms: vms.into_iter().collect(),
            continuous: false,
        }
    }
}

impl SatConstraint for Gather {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Gather
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        self.vms.clone()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        running_hosts(mo.mapping(), &self.vms).len() <= 1
    }
}

impl fmt::Display for Gather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gather(vms=")?;
        fmt_set(f, &self.vms)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── Lonely ────────────────────────────────────────────────────────

/// Nodes hosting the running VMs must host no other running VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lonely {
    pub vms: BTreeSet<VmId>,
    pub continuous: bool,
}

impl Lonely {
    pub fn new(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self {
            vms: vms.into_iter().collect(),
            continuous: false,
        }
    }
}

impl SatConstraint for Lonely {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Lonely
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        self.vms.clone()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let m = mo.mapping();
        running_hosts(m, &self.vms)
            .into_iter()
            .all(|host| m.running_vms_on(host).all(|vm| self.vms.contains(&vm)))
    }
}

impl fmt::Display for Lonely {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lonely(vms=")?;
        fmt_set(f, &self.vms)?;
        fmt_restriction(f, self.continuous)
    }
}

// ── Seq ───────────────────────────────────────────────────────────

/// The actions of the VMs must be executed in the given order. An
/// ordering only exists along a plan, so the discrete check always
/// holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seq {
    pub vms: Vec<VmId>,
}

impl SatConstraint for Seq {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Seq
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        self.vms.iter().copied().collect()
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

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq(vms=[")?;
        for (i, vm) in self.vms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{vm}")?;
        }
        write!(f, "], continuous)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three online nodes; vm0, vm1 on node0, vm2 on node1, vm3 on node2,
    /// vm4 ready.
    fn model() -> Model {
        let mut mo = Model::new();
        let ns: Vec<_> = (0..3).map(|_| mo.new_node()).collect();
        let vs: Vec<_> = (0..5).map(|_| mo.new_vm()).collect();
        let m = mo.mapping_mut();
        for &n in &ns {
            m.add_online_node(n).unwrap();
        }
        m.add_running_vm(vs[0], ns[0]).unwrap();
        m.add_running_vm(vs[1], ns[0]).unwrap();
        m.add_running_vm(vs[2], ns[1]).unwrap();
        m.add_running_vm(vs[3], ns[2]).unwrap();
        m.add_ready_vm(vs[4]).unwrap();
        mo
    }

    fn vms(ids: &[u32]) -> BTreeSet<VmId> {
        ids.iter().map(|i| VmId(*i)).collect()
    }

    fn nodes(ids: &[u32]) -> BTreeSet<NodeId> {
        ids.iter().map(|i| NodeId(*i)).collect()
    }

    #[test]
    fn among_needs_a_single_group() {
        let mo = model();
        let c = Among::new(vms(&[0, 2]), vec![nodes(&[0, 1]), nodes(&[2])]);
        assert!(c.is_satisfied(&mo));
        let c = Among::new(vms(&[0, 3]), vec![nodes(&[0, 1]), nodes(&[2])]);
        assert!(!c.is_satisfied(&mo));
        assert_eq!(c.involved_nodes(), nodes(&[0, 1, 2]));
    }

    #[test]
    fn split_and_split_among() {
        let mo = model();
        assert!(Split::new(vec![vms(&[0, 1]), vms(&[2]), vms(&[3, 4])]).is_satisfied(&mo));
        assert!(!Split::new(vec![vms(&[0]), vms(&[1])]).is_satisfied(&mo));

        let ok = SplitAmong::new(vec![vms(&[0, 2]), vms(&[3])], vec![nodes(&[0, 1]), nodes(&[2])]);
        assert!(ok.is_satisfied(&mo));
        let shared = SplitAmong::new(vec![vms(&[0]), vms(&[2])], vec![nodes(&[0, 1]), nodes(&[2])]);
        assert!(!shared.is_satisfied(&mo));
    }

    #[test]
    fn spread_gather_lonely() {
        let mo = model();
        assert!(Spread::new(vms(&[0, 2, 3, 4])).is_satisfied(&mo));
        assert!(!Spread::new(vms(&[0, 1])).is_satisfied(&mo));
        assert!(Gather::new(vms(&[0, 1, 4])).is_satisfied(&mo));
        assert!(!Gather::new(vms(&[0, 2])).is_satisfied(&mo));
        assert!(Lonely::new(vms(&[0, 1, 2])).is_satisfied(&mo));
        assert!(!Lonely::new(vms(&[0, 2])).is_satisfied(&mo));
    }

    #[test]
    fn seq_keeps_its_order() {
        let c = Seq { vms: vec![VmId(2), VmId(0)] };
        assert_eq!(c.to_string(), "seq(vms=[vm#2, vm#0], continuous)");
        assert_eq!(c.involved_vms(), vms(&[0, 2]));
    }
}
