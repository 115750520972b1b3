//! Constraints anchored on a single node.

use std::collections::BTreeSet;
use std::fmt;

use rackplan_model::{Model, NodeId, VmId};

use crate::constraint::{SatConstraint, fmt_restriction};
use crate::kind::ConstraintKind;

/// The node must be online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Online {
    pub node: NodeId,
}

/// The node must be offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offline {
    pub node: NodeId,
}

impl SatConstraint for Online {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Online
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::from([self.node])
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        mo.mapping().is_online(self.node)
    }
}

impl SatConstraint for Offline {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Offline
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::from([self.node])
    }

    fn is_continuous(&self) -> bool {
        false
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        mo.mapping().is_offline(self.node)
    }
}

impl fmt::Display for Online {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "online(node={}, discrete)", self.node)
    }
}

impl fmt::Display for Offline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offline(node={}, discrete)", self.node)
    }
}

/// No VM may arrive on or leave the node. Like [`Root`](crate::Root),
/// it restricts the path, so the discrete check always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quarantine {
    pub node: NodeId,
}

impl SatConstraint for Quarantine {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Quarantine
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::from([self.node])
    }

    fn is_continuous(&self) -> bool {
        true
    }

    fn is_satisfied(&self, _: &Model) -> bool {
        true
    }
}

impl fmt::Display for Quarantine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quarantine(node={}, continuous)", self.node)
    }
}

/// The VMs running on the node may consume at most `ratio` times its
/// capacity of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Overbook {
    pub node: NodeId,
    pub resource: String,
    pub ratio: f64,
    pub continuous: bool,
}

impl Overbook {
    pub fn new(node: NodeId, resource: impl Into<String>, ratio: f64) -> Self {
        Self {
            node,
            resource: resource.into(),
            ratio,
            continuous: false,
        }
    }
}

impl SatConstraint for Overbook {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Overbook
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        BTreeSet::new()
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::from([self.node])
    }

    fn is_continuous(&self) -> bool {
        self.continuous
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        let Some(rc) = mo.resource(&self.resource) else {
            return false;
        };
        let used = rc.sum_consumptions(mo.mapping().running_vms_on(self.node));
        used as f64 <= f64::from(rc.capacity(self.node)) * self.ratio
    }
}

impl fmt::Display for Overbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "overbook(node={}, rc={}, ratio={}",
            self.node, self.resource, self.ratio
        )?;
        fmt_restriction(f, self.continuous)
    }
}
