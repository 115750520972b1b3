//! Splitters for constraints over groups of VMs.
//!
//! A group restricted to a partition is only worth a copy when it still
//! constrains something there: two VM groups or more for the split
//! constraints, two VMs or more for the others. `Among` is kept whenever
//! the partition holds one of its VMs, since even one node group left (or
//! none) still restricts where they run. Elements that belong to no
//! partition are left out of every copy.

use std::collections::{BTreeMap, BTreeSet};

use rackplan_constraint::{
    Among, Constraint, ConstraintKind, Gather, Lonely, Seq, Split, SplitAmong, Spread,
};
use rackplan_model::{NodeId, VmId};
use tracing::{debug, warn};

use super::{ConstraintSplitter, SplitOutput, expect_variant};
use crate::element_set::SplittableElementSet;
use crate::error::{SplitError, SplitResult};
use crate::index::PartitionIndex;

fn vm_set(vms: &BTreeSet<VmId>, cstr: &Constraint, index: &PartitionIndex) -> SplittableElementSet<VmId> {
    let set = SplittableElementSet::new(vms.iter().copied(), index);
    if !set.unassigned().is_empty() {
        debug!(
            constraint = %cstr,
            left_out = set.unassigned().len(),
            "VMs outside any partition left out"
        );
    }
    set
}

/// Each group restricted to the nodes of a partition, empty ones removed.
fn restrict_groups(groups: &[BTreeSet<NodeId>], scope: &BTreeSet<NodeId>) -> Vec<BTreeSet<NodeId>> {
    groups
        .iter()
        .map(|g| g.intersection(scope).copied().collect::<BTreeSet<_>>())
        .filter(|g| !g.is_empty())
        .collect()
}

/// VM groups per partition, empty ones removed.
fn vm_groups_by_partition(
    groups: &[BTreeSet<VmId>],
    cstr: &Constraint,
    index: &PartitionIndex,
) -> BTreeMap<usize, Vec<BTreeSet<VmId>>> {
    let mut per_part: BTreeMap<usize, Vec<BTreeSet<VmId>>> = BTreeMap::new();
    for g in groups {
        for (p, sub) in vm_set(g, cstr, index).partitions() {
            per_part.entry(p).or_default().push(sub.clone());
        }
    }
    per_part
}

// ── Among ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AmongSplitter;

impl ConstraintSplitter for AmongSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Among
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let among = expect_variant!(cstr, Among);
        for (p, vms) in vm_set(&among.vms, cstr, index).partitions() {
            let groups = restrict_groups(&among.groups, index.nodes_of(p));
            if groups.is_empty() {
                debug!(constraint = %cstr, partition = p, "no node group left in partition, VMs cannot run there");
            }
            out.assign(
                p,
                Among {
                    vms: vms.clone(),
                    groups,
                    continuous: among.continuous,
                }
                .into(),
            );
        }
        Ok(())
    }
}

// ── Split / SplitAmong ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitSplitter;

impl ConstraintSplitter for SplitSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Split
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let split = expect_variant!(cstr, Split);
        for (p, groups) in vm_groups_by_partition(&split.groups, cstr, index) {
            if groups.len() < 2 {
                debug!(constraint = %cstr, partition = p, "split vacuous in partition, dropped");
                continue;
            }
            out.assign(
                p,
                Split {
                    groups,
                    continuous: split.continuous,
                }
                .into(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitAmongSplitter;

impl ConstraintSplitter for SplitAmongSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::SplitAmong
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let sa = expect_variant!(cstr, SplitAmong);
        for (p, vm_groups) in vm_groups_by_partition(&sa.vm_groups, cstr, index) {
            if vm_groups.len() < 2 {
                debug!(constraint = %cstr, partition = p, "splitAmong vacuous in partition, dropped");
                continue;
            }
            out.assign(
                p,
                SplitAmong {
                    vm_groups,
                    node_groups: restrict_groups(&sa.node_groups, index.nodes_of(p)),
                    continuous: sa.continuous,
                }
                .into(),
            );
        }
        Ok(())
    }
}

// ── Spread ────────────────────────────────────────────────────────

/// One reduced copy per partition holding at least two of the VMs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadSplitter;

impl ConstraintSplitter for SpreadSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Spread
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let spread = expect_variant!(cstr, Spread);
        for (p, vms) in vm_set(&spread.vms, cstr, index).partitions() {
            if vms.len() < 2 {
                continue;
            }
            out.assign(
                p,
                Spread {
                    vms: vms.clone(),
                    continuous: spread.continuous,
                }
                .into(),
            );
        }
        Ok(())
    }
}

// ── Gather / Lonely ───────────────────────────────────────────────

/// All-or-nothing group constraints. Only the first partition holding at
/// least two of the VMs receives a copy.
#[derive(Debug, Clone, Copy)]
pub struct SingleGroupSplitter {
    kind: ConstraintKind,
}

impl SingleGroupSplitter {
    /// A splitter for `Gather` or `Lonely` constraints.
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind }
    }
}

impl ConstraintSplitter for SingleGroupSplitter {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let (vms, continuous) = match cstr {
            Constraint::Gather(g) if self.kind == ConstraintKind::Gather => (&g.vms, g.continuous),
            Constraint::Lonely(l) if self.kind == ConstraintKind::Lonely => (&l.vms, l.continuous),
            other => {
                return Err(SplitError::Mismatch {
                    expected: self.kind,
                    constraint: other.to_string(),
                });
            }
        };
        let set = vm_set(vms, cstr, index);
        let Some((p, sub)) = set.partitions().find(|(_, s)| s.len() >= 2) else {
            debug!(constraint = %cstr, "no partition holds two of its VMs, dropped");
            return Ok(());
        };
        if set.nb_partitions() > 1 {
            warn!(
                constraint = %cstr,
                partition = p,
                spans = set.nb_partitions(),
                "group spans several partitions, only one keeps it"
            );
        }
        let vms = sub.clone();
        let reduced: Constraint = match cstr {
            Constraint::Lonely(_) => Lonely { vms, continuous }.into(),
            _ => Gather { vms, continuous }.into(),
        };
        out.assign(p, reduced);
        Ok(())
    }
}

// ── Seq ───────────────────────────────────────────────────────────

/// An ordering cannot be honoured across independently solved
/// partitions: a sequence spanning several partitions fails the split.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqSplitter;

impl ConstraintSplitter for SeqSplitter {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Seq
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let seq = expect_variant!(cstr, Seq);
        let set = SplittableElementSet::new(seq.vms.iter().copied(), index);
        match set.nb_partitions() {
            0 => {
                debug!(constraint = %cstr, "sequence outside any partition, dropped");
                Ok(())
            }
            1 => {
                let Some((p, _)) = set.partitions().next() else {
                    return Ok(());
                };
                let vms = seq
                    .vms
                    .iter()
                    .copied()
                    .filter(|vm| index.vm_partition(*vm) == Some(p))
                    .collect();
                out.assign(p, Seq { vms }.into());
                Ok(())
            }
            n => Err(SplitError::Unsupported {
                constraint: cstr.to_string(),
                reason: format!("the sequence spans {n} partitions"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn split(s: &dyn ConstraintSplitter, c: Constraint) -> SplitResult<SplitOutput> {
        let idx = two_partitions();
        let mut out = SplitOutput::new(idx.nb_partitions());
        s.split(&c, &idx, &mut out)?;
        Ok(out)
    }

    #[test]
    fn gather_goes_to_the_partition_holding_two_vms() {
        // vm#0 alone in partition 0, vm#4..6 in partition 1.
        let out = split(
            &SingleGroupSplitter::new(ConstraintKind::Gather),
            Gather::new([VmId(0), VmId(4), VmId(5), VmId(6)]).into(),
        )
        .unwrap();
        assert!(out.partition(0).is_empty());
        assert_eq!(
            out.partition(1),
            &[Constraint::from(Gather::new([VmId(4), VmId(5), VmId(6)]))]
        );
    }

    #[test]
    fn lonely_keeps_its_kind() {
        let out = split(
            &SingleGroupSplitter::new(ConstraintKind::Lonely),
            Lonely::new([VmId(0), VmId(1), VmId(4), VmId(5)]).into(),
        )
        .unwrap();
        assert_eq!(out.partition(0), &[Constraint::from(Lonely::new([VmId(0), VmId(1)]))]);
        assert!(out.partition(1).is_empty());
    }

    #[test]
    fn among_is_kept_in_every_partition_holding_its_vms() {
        let c = Among::new(
            [VmId(0), VmId(4)],
            vec![nodes(&[0, 2]), nodes(&[1]), nodes(&[3, 8])],
        );
        let out = split(&AmongSplitter, c.into()).unwrap();
        assert_eq!(
            out.partition(0),
            &[Constraint::from(Among::new([VmId(0)], vec![nodes(&[0]), nodes(&[1])]))]
        );
        assert_eq!(
            out.partition(1),
            &[Constraint::from(Among::new([VmId(4)], vec![nodes(&[2]), nodes(&[3])]))]
        );

        // A single group left pins the VMs to it.
        let c = Among::new([VmId(4)], vec![nodes(&[0]), nodes(&[2, 3])]);
        let out = split(&AmongSplitter, c.into()).unwrap();
        assert!(out.partition(0).is_empty());
        assert_eq!(
            out.partition(1),
            &[Constraint::from(Among::new([VmId(4)], vec![nodes(&[2, 3])]))]
        );

        // No group left: the copy forbids running the VMs in the partition.
        let c = Among::new([VmId(0)], vec![nodes(&[2]), nodes(&[3])]);
        let out = split(&AmongSplitter, c.into()).unwrap();
        assert_eq!(out.partition(0), &[Constraint::from(Among::new([VmId(0)], Vec::new()))]);
        assert!(out.partition(1).is_empty());
    }

    #[test]
    fn split_drops_partitions_with_a_single_group() {
        let c = Split::new(vec![vms(&[0, 4]), vms(&[1]), vms(&[5, 8])]);
        let out = split(&SplitSplitter, c.into()).unwrap();
        assert_eq!(
            out.partition(0),
            &[Constraint::from(Split::new(vec![vms(&[0]), vms(&[1])]))]
        );
        assert_eq!(
            out.partition(1),
            &[Constraint::from(Split::new(vec![vms(&[4]), vms(&[5])]))]
        );

        let c = Split::new(vec![vms(&[0, 1]), vms(&[4])]);
        let out = split(&SplitSplitter, c.into()).unwrap();
        assert!(out.into_parts().iter().all(Vec::is_empty));
    }

    #[test]
    fn split_among_restricts_node_groups() {
        let c = SplitAmong::new(
            vec![vms(&[0, 6]), vms(&[2, 7])],
            vec![nodes(&[0, 2]), nodes(&[1, 3])],
        );
        let out = split(&SplitAmongSplitter, c.into()).unwrap();
        assert_eq!(
            out.partition(0),
            &[Constraint::from(SplitAmong::new(
                vec![vms(&[0]), vms(&[2])],
                vec![nodes(&[0]), nodes(&[1])],
            ))]
        );
        assert_eq!(out.partition(1).len(), 1);
    }

    #[test]
    fn spread_copies_per_partition() {
        let out = split(&SpreadSplitter, Spread::new([VmId(0), VmId(2), VmId(4)]).into()).unwrap();
        assert_eq!(out.partition(0), &[Constraint::from(Spread::new([VmId(0), VmId(2)]))]);
        assert!(out.partition(1).is_empty());
    }

    #[test]
    fn seq_within_a_partition_is_kept() {
        let c: Constraint = Seq { vms: vec![VmId(5), VmId(4), VmId(8)] }.into();
        let out = split(&SeqSplitter, c).unwrap();
        assert_eq!(
            out.partition(1),
            &[Constraint::from(Seq { vms: vec![VmId(5), VmId(4)] })]
        );
    }

    #[test]
    fn seq_across_partitions_is_unsupported() {
        let c: Constraint = Seq { vms: vec![VmId(0), VmId(4)] }.into();
        let err = split(&SeqSplitter, c).unwrap_err();
        assert!(matches!(err, SplitError::Unsupported { .. }));
    }
}
