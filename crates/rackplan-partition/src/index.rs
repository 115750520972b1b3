//! Partition index: which partition every VM and node belongs to.
//!
//! The index is built once per partitioning run from the node groups and
//! a single scan of the parent mapping, then only read. It is what the
//! constraint splitters use to route a constraint to its partitions.

use std::collections::{BTreeMap, BTreeSet};

use rackplan_model::{Mapping, NodeId, VmId};
use tracing::trace;

use crate::error::{PartitionError, PartitionResult};

static NO_NODES: BTreeSet<NodeId> = BTreeSet::new();
static NO_VMS: BTreeSet<VmId> = BTreeSet::new();

/// Elements of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub nodes: BTreeSet<NodeId>,
    /// VMs hosted (running or sleeping) on the nodes.
    pub hosted: BTreeSet<VmId>,
    /// Ready VMs dealt to the partition.
    pub ready: BTreeSet<VmId>,
}

/// Partition number of every partitioned VM and node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionIndex {
    vms: BTreeMap<VmId, usize>,
    nodes: BTreeMap<NodeId, usize>,
    scopes: Vec<Scope>,
}

impl PartitionIndex {
    /// Index the given node groups over a mapping.
    ///
    /// Groups must be disjoint and only reference nodes of the mapping.
    /// Disjointness is checked by counting: the sum of the group sizes
    /// must equal the size of their union.
    pub fn build(mapping: &Mapping, groups: Vec<BTreeSet<NodeId>>) -> PartitionResult<Self> {
        let total: usize = groups.iter().map(BTreeSet::len).sum();
        let union: BTreeSet<NodeId> = groups.iter().flatten().copied().collect();
        if total != union.len() {
            return Err(PartitionError::Overlapping {
                total,
                distinct: union.len(),
            });
        }
        if let Some(&n) = union.iter().find(|n| !mapping.contains_node(**n)) {
            return Err(PartitionError::UnknownNode(n));
        }

        let mut idx = PartitionIndex {
            scopes: Vec::with_capacity(groups.len()),
            ..Default::default()
        };
        for (p, nodes) in groups.into_iter().enumerate() {
            idx.nodes.extend(nodes.iter().map(|n| (*n, p)));
            idx.scopes.push(Scope {
                nodes,
                ..Default::default()
            });
        }

        for vm in mapping.all_vms() {
            let host = mapping.vm_state(vm).and_then(|st| st.host());
            if let Some(&p) = host.and_then(|h| idx.nodes.get(&h)) {
                idx.vms.insert(vm, p);
                idx.scopes[p].hosted.insert(vm);
            }
        }
        trace!(
            partitions = idx.scopes.len(),
            nodes = idx.nodes.len(),
            vms = idx.vms.len(),
            "partition index built"
        );
        Ok(idx)
    }

    /// Deal a ready VM to a partition. Returns `false` when the partition
    /// does not exist or the VM already belongs to one.
    pub fn assign_ready(&mut self, vm: VmId, p: usize) -> bool {
        if p >= self.scopes.len() || self.vms.contains_key(&vm) {
            return false;
        }
        self.vms.insert(vm, p);
        self.scopes[p].ready.insert(vm);
        true
    }

    pub fn nb_partitions(&self) -> usize {
        self.scopes.len()
    }

    pub fn vm_partition(&self, vm: VmId) -> Option<usize> {
        self.vms.get(&vm).copied()
    }

    pub fn node_partition(&self, n: NodeId) -> Option<usize> {
        self.nodes.get(&n).copied()
    }

    pub fn scope(&self, p: usize) -> Option<&Scope> {
        self.scopes.get(p)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Nodes of a partition. Empty for an unknown partition.
    pub fn nodes_of(&self, p: usize) -> &BTreeSet<NodeId> {
        self.scopes.get(p).map_or(&NO_NODES, |s| &s.nodes)
    }

    /// Ready VMs of a partition. Empty for an unknown partition.
    pub fn ready_of(&self, p: usize) -> &BTreeSet<VmId> {
        self.scopes.get(p).map_or(&NO_VMS, |s| &s.ready)
    }

    /// Number of VMs that belong to a partition.
    pub fn nb_assigned_vms(&self) -> usize {
        self.vms.len()
    }

    pub fn nb_assigned_nodes(&self) -> usize {
        self.nodes.len()
    }
}
