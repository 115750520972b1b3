//! Splitter for aggregates over node sets (`MaxOnline`, `RunningCapacity`).
//!
//! An aggregate is only preserved when all its nodes lie in one
//! partition. Otherwise the first partition it touches gets a copy
//! restricted to its own nodes and the others get nothing, which leaves
//! them under-constrained.

use std::collections::BTreeSet;

use rackplan_constraint::{Constraint, ConstraintKind, MaxOnline, RunningCapacity};
use rackplan_model::NodeId;
use tracing::{debug, warn};

use super::{ConstraintSplitter, SplitOutput};
use crate::element_set::SplittableElementSet;
use crate::error::{SplitError, SplitResult};
use crate::index::PartitionIndex;

#[derive(Debug, Clone, Copy)]
pub struct CapacitySplitter {
    kind: ConstraintKind,
}

impl CapacitySplitter {
    /// A splitter for `MaxOnline` or `RunningCapacity` constraints.
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind }
    }
}

impl ConstraintSplitter for CapacitySplitter {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let nodes: &BTreeSet<NodeId> = match cstr {
            Constraint::MaxOnline(c) if self.kind == ConstraintKind::MaxOnline => &c.nodes,
            Constraint::RunningCapacity(c) if self.kind == ConstraintKind::RunningCapacity => &c.nodes,
            other => {
                return Err(SplitError::Mismatch {
                    expected: self.kind,
                    constraint: other.to_string(),
                });
            }
        };
        let set = SplittableElementSet::new(nodes.iter().copied(), index);
        let Some((p, sub)) = set.partitions().next() else {
            debug!(constraint = %cstr, "no node in any partition, dropped");
            return Ok(());
        };
        if set.nb_partitions() > 1 {
            warn!(
                constraint = %cstr,
                partition = p,
                spans = set.nb_partitions(),
                "capacity spans several partitions, only the first one is constrained"
            );
        }
        let reduced: Constraint = match cstr {
            Constraint::MaxOnline(c) => MaxOnline {
                nodes: sub.clone(),
                amount: c.amount,
                continuous: c.continuous,
            }
            .into(),
            Constraint::RunningCapacity(c) => RunningCapacity {
                nodes: sub.clone(),
                amount: c.amount,
                continuous: c.continuous,
            }
            .into(),
            _ => return Ok(()),
        };
        out.assign(p, reduced);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn capacity_within_one_partition_is_unchanged() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        let c: Constraint = MaxOnline::new([NodeId(2), NodeId(3)], 1).into();
        CapacitySplitter::new(ConstraintKind::MaxOnline)
            .split(&c, &idx, &mut out)
            .unwrap();
        assert!(out.partition(0).is_empty());
        assert_eq!(out.partition(1), &[c]);
    }

    #[test]
    fn spanning_capacity_only_constrains_the_first_partition() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        let c: Constraint = RunningCapacity::new([NodeId(1), NodeId(2), NodeId(3)], 4).into();
        CapacitySplitter::new(ConstraintKind::RunningCapacity)
            .split(&c, &idx, &mut out)
            .unwrap();
        assert_eq!(
            out.partition(0),
            &[Constraint::from(RunningCapacity::new([NodeId(1)], 4))]
        );
        assert!(out.partition(1).is_empty());
    }
}
