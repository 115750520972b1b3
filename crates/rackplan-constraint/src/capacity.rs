//! Cluster-wide aggregate constraints over a set of nodes.

use std::collections::BTreeSet;
use std::fmt;

use rackplan_model::{Model, NodeId, VmId};

use crate::constraint::{SatConstraint, fmt_restriction, fmt_set};
use crate::kind::ConstraintKind;

/// At most `amount` of the nodes may be online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxOnline {
    pub nodes: BTreeSet<NodeId>,
    pub amount: usize,
    pub continuous: bool,
}

impl MaxOnline {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>, amount: usize) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            amount,
            continuous: false,
        }
    }
}

impl SatConstraint for MaxOnline {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MaxOnline
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes.clone()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let online = self
            .nodes
            .iter()
            .filter(|n| mo.mapping().is_online(**n))
            .count();
        online <= self.amount
    }
}

impl fmt::Display for MaxOnline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "maxOnline(nodes=")?;
        fmt_set(f, &self.nodes)?;
        write!(f, ", amount={}", self.amount)?;
        fmt_restriction(f, self.continuous)
    }
}

/// At most `amount` VMs may run on the nodes altogether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningCapacity {
    pub nodes: BTreeSet<NodeId>,
    pub amount: usize,
    pub continuous: bool,
}

impl RunningCapacity {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>, amount: usize) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            amount,
            continuous: false,
        }
    }
}

impl SatConstraint for RunningCapacity {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RunningCapacity
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes.clone()
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let running: usize = self
            .nodes
            .iter()
            .map(|n| mo.mapping().nb_running_vms_on(*n))
            .sum();
        running <= self.amount
    }
}

impl fmt::Display for RunningCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runningCapacity(nodes=")?;
        fmt_set(f, &self.nodes)?;
        write!(f, ", amount={}", self.amount)?;
        fmt_restriction(f, self.continuous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_count_over_the_node_set() {
        let mut mo = Model::new();
        let (n0, n1, n2) = (mo.new_node(), mo.new_node(), mo.new_node());
        let (v0, v1) = (mo.new_vm(), mo.new_vm());
        let m = mo.mapping_mut();
        m.add_online_node(n0).unwrap();
        m.add_online_node(n1).unwrap();
        m.add_offline_node(n2).unwrap();
        m.add_running_vm(v0, n0).unwrap();
        m.add_running_vm(v1, n1).unwrap();

        assert!(MaxOnline::new([n0, n2], 1).is_satisfied(&mo));
        assert!(!MaxOnline::new([n0, n1, n2], 1).is_satisfied(&mo));
        assert!(RunningCapacity::new([n0, n1], 2).is_satisfied(&mo));
        assert!(!RunningCapacity::new([n0, n1], 1).is_satisfied(&mo));
    }
}
