//! Splitters for constraints anchored on a single VM or node.

use std::collections::BTreeSet;

use rackplan_constraint::{Ban, Constraint, ConstraintKind, Fence, SatConstraint};
use rackplan_model::{NodeId, VmId};
use tracing::debug;

use super::{ConstraintSplitter, SplitOutput, expect_variant};
use crate::error::{SplitError, SplitResult};
use crate::index::PartitionIndex;

fn vm_partition(cstr: &Constraint, vm: VmId, index: &PartitionIndex) -> SplitResult<usize> {
    index.vm_partition(vm).ok_or_else(|| SplitError::UnassignedVm {
        constraint: cstr.to_string(),
        vm,
    })
}

fn node_partition(cstr: &Constraint, node: NodeId, index: &PartitionIndex) -> SplitResult<usize> {
    index.node_partition(node).ok_or_else(|| SplitError::UnassignedNode {
        constraint: cstr.to_string(),
        node,
    })
}

fn no_anchor(cstr: &Constraint) -> SplitError {
    SplitError::Unsupported {
        constraint: cstr.to_string(),
        reason: "no anchor element".into(),
    }
}

/// Copies a VM-anchored constraint, unchanged, into the VM's partition.
#[derive(Debug, Clone, Copy)]
pub struct VmAnchoredSplitter {
    kind: ConstraintKind,
}

impl VmAnchoredSplitter {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind }
    }
}

impl ConstraintSplitter for VmAnchoredSplitter {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let vm = cstr.involved_vms().first().copied().ok_or_else(|| no_anchor(cstr))?;
        let p = vm_partition(cstr, vm, index)?;
        out.assign(p, cstr.clone());
        Ok(())
    }
}

/// Copies a node-anchored constraint, unchanged, into the node's partition.
#[derive(Debug, Clone, Copy)]
pub struct NodeAnchoredSplitter {
    kind: ConstraintKind,
}

impl NodeAnchoredSplitter {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind }
    }
}

impl ConstraintSplitter for NodeAnchoredSplitter {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let node = cstr.involved_nodes().first().copied().ok_or_else(|| no_anchor(cstr))?;
        let p = node_partition(cstr, node, index)?;
        out.assign(p, cstr.clone());
        Ok(())
    }
}

/// Keeps the banned nodes of the VM's partition. A ban that reaches no
/// node of the partition is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BanSplitter;

impl ConstraintSplitter for BanSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Ban
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let ban = expect_variant!(cstr, Ban);
        let p = vm_partition(cstr, ban.vm, index)?;
        let nodes: BTreeSet<NodeId> = ban.nodes.intersection(index.nodes_of(p)).copied().collect();
        if nodes.is_empty() {
            debug!(constraint = %cstr, partition = p, "ban reaches no node of its partition, dropped");
            return Ok(());
        }
        out.assign(
            p,
            Ban {
                vm: ban.vm,
                nodes,
                continuous: ban.continuous,
            }
            .into(),
        );
        Ok(())
    }
}

/// Keeps the allowed nodes of the VM's partition. The copy is kept even
/// when no allowed node is left: the VM then cannot run in its partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct FenceSplitter;

impl ConstraintSplitter for FenceSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Fence
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let fence = expect_variant!(cstr, Fence);
        let p = vm_partition(cstr, fence.vm, index)?;
        let nodes: BTreeSet<NodeId> = fence.nodes.intersection(index.nodes_of(p)).copied().collect();
        if nodes.is_empty() {
            debug!(constraint = %cstr, partition = p, "fence allows no node of its partition");
        }
        out.assign(
            p,
            Fence {
                vm: fence.vm,
                nodes,
                continuous: fence.continuous,
            }
            .into(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use rackplan_constraint::{Online, Overbook, Running};

    #[test]
    fn ban_keeps_the_nodes_of_the_vm_partition() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        BanSplitter
            .split(&Ban::new(VmId(0), [NodeId(1), NodeId(2)]).into(), &idx, &mut out)
            .unwrap();
        assert_eq!(out.partition(0), &[Constraint::from(Ban::new(VmId(0), [NodeId(1)]))]);
        assert!(out.partition(1).is_empty());
    }

    #[test]
    fn ban_outside_the_partition_is_dropped() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        BanSplitter
            .split(&Ban::new(VmId(0), [NodeId(3)]).into(), &idx, &mut out)
            .unwrap();
        assert!(out.into_parts().iter().all(Vec::is_empty));
    }

    #[test]
    fn fence_is_kept_even_when_empty() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        FenceSplitter
            .split(&Fence::new(VmId(6), [NodeId(0)]).into(), &idx, &mut out)
            .unwrap();
        let Constraint::Fence(f) = &out.partition(1)[0] else {
            panic!("expected a fence");
        };
        assert!(f.nodes.is_empty());
    }

    #[test]
    fn anchored_copies_are_unchanged() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        let run: Constraint = Running { vm: VmId(7) }.into();
        let online: Constraint = Online { node: NodeId(1) }.into();
        let over: Constraint = Overbook::new(NodeId(2), "cpu", 1.5).into();
        VmAnchoredSplitter::new(ConstraintKind::Running)
            .split(&run, &idx, &mut out)
            .unwrap();
        NodeAnchoredSplitter::new(ConstraintKind::Online)
            .split(&online, &idx, &mut out)
            .unwrap();
        NodeAnchoredSplitter::new(ConstraintKind::Overbook)
            .split(&over, &idx, &mut out)
            .unwrap();
        assert_eq!(out.partition(0), &[online]);
        assert_eq!(out.partition(1), &[run, over]);
    }

    #[test]
    fn anchor_outside_any_partition_is_an_error() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        let err = VmAnchoredSplitter::new(ConstraintKind::Running)
            .split(&Running { vm: VmId(8) }.into(), &idx, &mut out)
            .unwrap_err();
        assert!(matches!(err, SplitError::UnassignedVm { vm: VmId(8), .. }));
    }
}
