//! Partitioning strategies: how nodes are grouped into partitions.

use std::collections::BTreeSet;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rackplan_model::{Mapping, NodeId};

use crate::error::{PartitionError, PartitionResult};

/// Order in which nodes are picked up before being chunked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeOrder {
    /// Ascending identifiers.
    #[default]
    Stable,
    /// Shuffled. A seed makes the shuffle reproducible.
    Shuffled { seed: Option<u64> },
}

impl NodeOrder {
    fn enumerate(&self, mapping: &Mapping) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = mapping.all_nodes().into_iter().collect();
        if let NodeOrder::Shuffled { seed } = self {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(*s),
                None => StdRng::from_os_rng(),
            };
            nodes.shuffle(&mut rng);
        }
        nodes
    }
}

/// How an instance's nodes are split into disjoint groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Groups given explicitly. Nodes left out belong to no partition.
    FixedNodeSets(Vec<BTreeSet<NodeId>>),
    /// Exactly `min(count, nodes)` groups whose sizes differ by one at
    /// most, the larger ones first.
    FixedCount { count: usize, order: NodeOrder },
    /// Groups of a given size; the last one may be smaller.
    FixedSize { size: usize, order: NodeOrder },
}

impl PartitionStrategy {
    pub fn fixed_size(size: usize) -> Self {
        PartitionStrategy::FixedSize {
            size,
            order: NodeOrder::Stable,
        }
    }

    pub fn fixed_count(count: usize) -> Self {
        PartitionStrategy::FixedCount {
            count,
            order: NodeOrder::Stable,
        }
    }

    /// Node groups of the mapping. Disjointness of explicit groups is
    /// checked later, when the index is built.
    pub fn node_groups(&self, mapping: &Mapping) -> PartitionResult<Vec<BTreeSet<NodeId>>> {
        match self {
            PartitionStrategy::FixedNodeSets(groups) => Ok(groups.clone()),
            PartitionStrategy::FixedCount { count, order } => {
                if *count == 0 {
                    return Err(PartitionError::ZeroCount);
                }
                Ok(balanced(&order.enumerate(mapping), *count))
            }
            PartitionStrategy::FixedSize { size, order } => {
                if *size == 0 {
                    return Err(PartitionError::ZeroSize);
                }
                Ok(chunked(&order.enumerate(mapping), *size))
            }
        }
    }
}

fn chunked(nodes: &[NodeId], size: usize) -> Vec<BTreeSet<NodeId>> {
    nodes
        .chunks(size)
        .map(|c| c.iter().copied().collect())
        .collect()
}

fn balanced(nodes: &[NodeId], count: usize) -> Vec<BTreeSet<NodeId>> {
    let groups = count.min(nodes.len());
    if groups == 0 {
        return Vec::new();
    }
    let (base, extra) = (nodes.len() / groups, nodes.len() % groups);
    let mut rest = nodes;
    (0..groups)
        .map(|g| {
            let (head, tail) = rest.split_at(base + usize::from(g < extra));
            rest = tail;
            head.iter().copied().collect()
        })
        .collect()
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = |o: &NodeOrder| match o {
            NodeOrder::Stable => "",
            NodeOrder::Shuffled { .. } => ", random",
        };
        match self {
            PartitionStrategy::FixedNodeSets(g) => write!(f, "fixed-node-sets({} set(s))", g.len()),
            PartitionStrategy::FixedCount { count, order: o } => {
                write!(f, "fixed-count({count}{})", order(o))
            }
            PartitionStrategy::FixedSize { size, order: o } => {
                write!(f, "fixed-size({size}{})", order(o))
            }
        }
    }
}

/// What happens to ready VMs, which no node hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyVmPolicy {
    /// Ready VMs belong to no partition.
    #[default]
    Unassigned,
    /// Ready VMs are dealt to the partitions in turn.
    RoundRobin,
}

impl fmt::Display for ReadyVmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyVmPolicy::Unassigned => f.write_str("unassigned"),
            ReadyVmPolicy::RoundRobin => f.write_str("round-robin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: u32) -> Mapping {
        let mut m = Mapping::new();
        for i in 0..n {
            m.add_online_node(NodeId(i)).unwrap();
        }
        m
    }

    fn sizes(groups: &[BTreeSet<NodeId>]) -> Vec<usize> {
        groups.iter().map(BTreeSet::len).collect()
    }

    #[test]
    fn fixed_size_leaves_a_smaller_tail() {
        let g = PartitionStrategy::fixed_size(2).node_groups(&nodes(5)).unwrap();
        assert_eq!(sizes(&g), vec![2, 2, 1]);
        assert_eq!(g[0], BTreeSet::from([NodeId(0), NodeId(1)]));
    }

    #[test]
    fn fixed_count_gives_the_requested_number_of_groups() {
        let g = PartitionStrategy::fixed_count(2).node_groups(&nodes(4)).unwrap();
        assert_eq!(sizes(&g), vec![2, 2]);
        let g = PartitionStrategy::fixed_count(3).node_groups(&nodes(4)).unwrap();
        assert_eq!(sizes(&g), vec![2, 1, 1]);
        assert_eq!(g[1], BTreeSet::from([NodeId(2)]));
        let g = PartitionStrategy::fixed_count(4).node_groups(&nodes(10)).unwrap();
        assert_eq!(sizes(&g), vec![3, 3, 2, 2]);
        let g = PartitionStrategy::fixed_count(8).node_groups(&nodes(4)).unwrap();
        assert_eq!(sizes(&g), vec![1, 1, 1, 1]);
    }

    #[test]
    fn zero_parameters_are_rejected() {
        let m = nodes(3);
        assert_eq!(
            PartitionStrategy::fixed_size(0).node_groups(&m),
            Err(PartitionError::ZeroSize)
        );
        assert_eq!(
            PartitionStrategy::fixed_count(0).node_groups(&m),
            Err(PartitionError::ZeroCount)
        );
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let m = nodes(20);
        let s = PartitionStrategy::FixedSize {
            size: 6,
            order: NodeOrder::Shuffled { seed: Some(42) },
        };
        let a = s.node_groups(&m).unwrap();
        let b = s.node_groups(&m).unwrap();
        assert_eq!(a, b);
        assert_eq!(sizes(&a), vec![6, 6, 6, 2]);
        let all: BTreeSet<NodeId> = a.iter().flatten().copied().collect();
        assert_eq!(all, m.all_nodes());
    }

    #[test]
    fn no_nodes_no_groups() {
        let g = PartitionStrategy::fixed_count(3).node_groups(&Mapping::new()).unwrap();
        assert!(g.is_empty());
    }
}
