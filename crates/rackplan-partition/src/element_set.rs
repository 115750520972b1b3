//! Sets of elements grouped by partition.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rackplan_model::{NodeId, VmId};

use crate::index::PartitionIndex;

/// An element the partition index knows about.
pub trait Partitioned: Copy + Ord + fmt::Display {
    fn partition(&self, index: &PartitionIndex) -> Option<usize>;
}

impl Partitioned for VmId {
    fn partition(&self, index: &PartitionIndex) -> Option<usize> {
        index.vm_partition(*self)
    }
}

impl Partitioned for NodeId {
    fn partition(&self, index: &PartitionIndex) -> Option<usize> {
        index.node_partition(*self)
    }
}

/// A set of VMs or nodes split along a partition index.
///
/// Partitions are visited in ascending order; elements that belong to no
/// partition are kept aside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplittableElementSet<E> {
    parts: BTreeMap<usize, BTreeSet<E>>,
    unassigned: BTreeSet<E>,
}

impl<E: Partitioned> SplittableElementSet<E> {
    pub fn new(elements: impl IntoIterator<Item = E>, index: &PartitionIndex) -> Self {
        let mut parts: BTreeMap<usize, BTreeSet<E>> = BTreeMap::new();
        let mut unassigned = BTreeSet::new();
        for e in elements {
            match e.partition(index) {
                Some(p) => {
                    parts.entry(p).or_default().insert(e);
                }
                None => {
                    unassigned.insert(e);
                }
            }
        }
        Self { parts, unassigned }
    }

    /// Non-empty subsets, by ascending partition.
    pub fn partitions(&self) -> impl Iterator<Item = (usize, &BTreeSet<E>)> + '_ {
        self.parts.iter().map(|(p, s)| (*p, s))
    }

    /// Subset of a partition, `None` when no element belongs to it.
    pub fn subset(&self, p: usize) -> Option<&BTreeSet<E>> {
        self.parts.get(&p)
    }

    /// Number of partitions the set touches.
    pub fn nb_partitions(&self) -> usize {
        self.parts.len()
    }

    pub fn unassigned(&self) -> &BTreeSet<E> {
        &self.unassigned
    }

    pub fn len(&self) -> usize {
        self.parts.values().map(BTreeSet::len).sum::<usize>() + self.unassigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Partitioned> fmt::Display for SplittableElementSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, set) in self.parts.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("{")?;
            for (j, e) in set.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{e}")?;
            }
            f.write_str("}")?;
        }
        f.write_str("}")
    }
}
