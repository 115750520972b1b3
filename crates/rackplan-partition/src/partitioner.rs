//! The partitioner: one instance in, disjoint sub-instances out.

use std::time::Instant;

use rackplan_constraint::Instance;
use rackplan_model::VmId;
use tracing::{debug, info};

use crate::error::PartitionResult;
use crate::index::PartitionIndex;
use crate::splitter::SplitterRegistry;
use crate::strategy::{PartitionStrategy, ReadyVmPolicy};

/// Result of a partitioning run.
#[derive(Debug, Clone)]
pub struct Partitioning {
    pub index: PartitionIndex,
    /// One sub-instance per partition, in partition order.
    pub instances: Vec<Instance>,
    /// Time spent partitioning and splitting, in milliseconds.
    pub split_ms: u64,
}

/// Cuts an instance into disjoint sub-instances, each holding its share
/// of the constraints.
#[derive(Debug)]
pub struct Partitioner {
    strategy: PartitionStrategy,
    ready_vms: ReadyVmPolicy,
    splitters: SplitterRegistry,
}

impl Partitioner {
    pub fn new(strategy: PartitionStrategy) -> Self {
        Self {
            strategy,
            ready_vms: ReadyVmPolicy::default(),
            splitters: SplitterRegistry::default(),
        }
    }

    pub fn with_ready_vms(mut self, policy: ReadyVmPolicy) -> Self {
        self.ready_vms = policy;
        self
    }

    pub fn with_splitters(mut self, splitters: SplitterRegistry) -> Self {
        self.splitters = splitters;
        self
    }

    pub fn strategy(&self) -> &PartitionStrategy {
        &self.strategy
    }

    pub fn ready_vms(&self) -> ReadyVmPolicy {
        self.ready_vms
    }

    pub fn splitters(&self) -> &SplitterRegistry {
        &self.splitters
    }

    pub fn splitters_mut(&mut self) -> &mut SplitterRegistry {
        &mut self.splitters
    }

    /// Partition an instance.
    ///
    /// The parent instance is only read. Every sub-model keeps the whole
    /// identifier registry of the parent, so plans computed on the
    /// sub-instances replay on the parent model unchanged.
    pub fn partition(&self, instance: &Instance) -> PartitionResult<Partitioning> {
        let started = Instant::now();
        let mo = instance.model();
        let groups = self.strategy.node_groups(mo.mapping())?;
        let mut index = PartitionIndex::build(mo.mapping(), groups)?;

        let nb = index.nb_partitions();
        if self.ready_vms == ReadyVmPolicy::RoundRobin && nb > 0 {
            let ready: Vec<VmId> = mo.mapping().ready_vms().collect();
            for (i, vm) in ready.into_iter().enumerate() {
                index.assign_ready(vm, i % nb);
            }
        }
        let unassigned = mo.mapping().nb_vms().saturating_sub(index.nb_assigned_vms());
        if unassigned > 0 {
            debug!(vms = unassigned, policy = %self.ready_vms, "VMs outside any partition");
        }

        let parts = self.splitters.split_all(instance.constraints(), &index)?;
        let mut instances = Vec::with_capacity(nb);
        for (p, cstrs) in parts.into_parts().into_iter().enumerate() {
            let scope = index.nodes_of(p);
            let sub = mo.sub_model(scope, index.ready_of(p))?;
            debug!(
                partition = p,
                nodes = sub.mapping().nb_nodes(),
                vms = sub.mapping().nb_vms(),
                constraints = cstrs.len(),
                "partition built"
            );
            instances.push(Instance::new(sub, cstrs, instance.objective()));
        }

        let split_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            strategy = %self.strategy,
            partitions = nb,
            split_ms,
            "instance partitioned"
        );
        Ok(Partitioning {
            index,
            instances,
            split_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::error::{PartitionError, SplitError};
    use crate::strategy::NodeOrder;
    use rackplan_constraint::{Ban, Constraint, Gather, Objective, Running, Seq};
    use rackplan_model::{Model, NodeId};

    /// `nodes` online nodes hosting `per_node` running VMs each, plus
    /// `ready` ready VMs; every VM must be running.
    fn cluster(nodes: usize, per_node: usize, ready: usize) -> Instance {
        let mut mo = Model::new();
        let mut cstrs: Vec<Constraint> = Vec::new();
        for _ in 0..nodes {
            let n = mo.new_node();
            mo.mapping_mut().add_online_node(n).unwrap();
            for _ in 0..per_node {
                let vm = mo.new_vm();
                mo.mapping_mut().add_running_vm(vm, n).unwrap();
                cstrs.push(Running { vm }.into());
            }
        }
        for _ in 0..ready {
            let vm = mo.new_vm();
            mo.mapping_mut().add_ready_vm(vm).unwrap();
            cstrs.push(Running { vm }.into());
        }
        Instance::new(mo, cstrs, Objective::MinMttr)
    }

    #[test]
    fn fixed_size_with_round_robin_ready_vms() {
        let i = cluster(13, 3, 5);
        let parts = Partitioner::new(PartitionStrategy::fixed_size(5))
            .with_ready_vms(ReadyVmPolicy::RoundRobin)
            .partition(&i)
            .unwrap();
        let nodes: Vec<usize> = parts.instances.iter().map(|i| i.model().mapping().nb_nodes()).collect();
        let running: Vec<usize> = parts
            .instances
            .iter()
            .map(|i| i.model().mapping().running_vms().count())
            .collect();
        let ready: Vec<usize> = parts
            .instances
            .iter()
            .map(|i| i.model().mapping().ready_vms().count())
            .collect();
        assert_eq!(nodes, vec![5, 5, 3]);
        assert_eq!(running, vec![15, 15, 9]);
        assert_eq!(ready, vec![2, 2, 1]);
        // Every constraint lands in exactly one partition.
        let total: usize = parts.instances.iter().map(|i| i.constraints().len()).sum();
        assert_eq!(total, 13 * 3 + 5);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let i = cluster(17, 2, 0);
        let strategy = PartitionStrategy::FixedCount {
            count: 4,
            order: NodeOrder::Shuffled { seed: Some(7) },
        };
        let parts = Partitioner::new(strategy).partition(&i).unwrap();
        assert_eq!(parts.instances.len(), 4);
        let mut seen = BTreeSet::new();
        for sub in &parts.instances {
            for n in sub.model().mapping().all_nodes() {
                assert!(seen.insert(n), "{n} in two partitions");
            }
        }
        assert_eq!(seen, i.model().mapping().all_nodes());
        for sub in &parts.instances {
            assert!(sub.validate().is_ok());
            assert_eq!(sub.model().registry(), i.model().registry());
        }
    }

    #[test]
    fn unassigned_ready_vm_under_constraint_is_an_error() {
        let i = cluster(2, 1, 1);
        let err = Partitioner::new(PartitionStrategy::fixed_size(1))
            .partition(&i)
            .unwrap_err();
        assert!(matches!(err, PartitionError::Split(SplitError::UnassignedVm { .. })));
    }

    #[test]
    fn overlapping_node_sets_fail_before_splitting() {
        let i = cluster(3, 1, 0);
        let sets = vec![
            BTreeSet::from([NodeId(0), NodeId(1)]),
            BTreeSet::from([NodeId(1), NodeId(2)]),
        ];
        let err = Partitioner::new(PartitionStrategy::FixedNodeSets(sets))
            .partition(&i)
            .unwrap_err();
        assert!(matches!(err, PartitionError::Overlapping { .. }));
    }

    #[test]
    fn constraints_are_projected() {
        let mut mo = Model::new();
        let ns: Vec<NodeId> = (0..4).map(|_| mo.new_node()).collect();
        let vms: Vec<_> = (0..4).map(|_| mo.new_vm()).collect();
        for (k, &n) in ns.iter().enumerate() {
            mo.mapping_mut().add_online_node(n).unwrap();
            mo.mapping_mut().add_running_vm(vms[k], n).unwrap();
        }
        let cstrs: Vec<Constraint> = vec![
            Ban::new(vms[0], [ns[1], ns[2]]).into(),
            Gather::new([vms[0], vms[1], vms[2]]).into(),
        ];
        let i = Instance::new(mo, cstrs, Objective::MinMttr);
        let parts = Partitioner::new(PartitionStrategy::fixed_size(2))
            .partition(&i)
            .unwrap();
        assert_eq!(
            parts.instances[0].constraints(),
            &[
                Constraint::from(Ban::new(vms[0], [ns[1]])),
                Constraint::from(Gather::new([vms[0], vms[1]])),
            ]
        );
        assert!(parts.instances[1].constraints().is_empty());

        let seq: Vec<Constraint> = vec![Seq { vms: vec![vms[0], vms[3]] }.into()];
        let i = Instance::new(i.model().clone(), seq, Objective::MinMttr);
        let err = Partitioner::new(PartitionStrategy::fixed_size(2))
            .partition(&i)
            .unwrap_err();
        assert!(matches!(err, PartitionError::Split(SplitError::Unsupported { .. })));
    }
}
