//! Static-partitioning driver: partition, solve in parallel, merge.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use rackplan_constraint::Instance;
use rackplan_partition::Partitioner;
use rackplan_plan::{Action, Plan};
use rackplan_solver::{InstanceSolver, Parameters, epoch_ms};

use crate::config::PlannerConfig;
use crate::error::RunnerResult;
use crate::merge::merge;
use crate::orchestrator::Orchestrator;
use crate::stats::StaticPartitioningStatistics;

/// What a planning request produced.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    /// The merged plan over the parent model, `None` when some partition
    /// has no solution.
    pub plan: Option<Plan>,
    /// Partition actions the merged plan refused.
    pub rejected: Vec<Action>,
    pub statistics: StaticPartitioningStatistics,
}

/// Solves an instance by cutting it into disjoint partitions solved
/// concurrently.
pub struct StaticPartitioning {
    partitioner: Partitioner,
    orchestrator: Orchestrator,
    solver: Arc<dyn InstanceSolver>,
    params: Parameters,
}

impl StaticPartitioning {
    /// A driver using one worker per available core.
    pub fn new(solver: Arc<dyn InstanceSolver>, partitioner: Partitioner) -> Self {
        Self {
            partitioner,
            orchestrator: Orchestrator::new(crate::default_workers()),
            solver,
            params: Parameters::default(),
        }
    }

    pub fn from_config(config: &PlannerConfig, solver: Arc<dyn InstanceSolver>) -> RunnerResult<Self> {
        let partitioner = Partitioner::new(config.partitioning.strategy()?)
            .with_ready_vms(config.partitioning.ready_vm_policy());
        Ok(Self {
            partitioner,
            orchestrator: Orchestrator::new(config.workers()).fail_fast(config.runner.fail_fast),
            solver,
            params: config.solver.clone(),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.orchestrator = self.orchestrator.with_workers(workers);
        self
    }

    pub fn is_fail_fast(&self) -> bool {
        self.orchestrator.is_fail_fast()
    }

    pub fn with_fail_fast(mut self, yes: bool) -> Self {
        self.orchestrator = self.orchestrator.fail_fast(yes);
        self
    }

    pub fn with_parameters(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    pub fn workers(&self) -> usize {
        self.orchestrator.workers()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Partition the instance, solve every partition and merge the plans.
    ///
    /// Partitioning errors are reported before anything is solved.
    pub async fn solve(&self, instance: &Instance) -> RunnerResult<PlanningOutcome> {
        let start = epoch_ms();
        let parts = self.partitioner.partition(instance)?;
        self.run(instance, parts.instances, parts.split_ms, start).await
    }

    /// Solve partitions that were cut by the caller. `parent` is the
    /// instance they come from; the merged plan is built over its model.
    pub async fn solve_instances(&self, parent: &Instance, parts: Vec<Instance>) -> RunnerResult<PlanningOutcome> {
        self.run(parent, parts, 0, epoch_ms()).await
    }

    async fn run(
        &self,
        parent: &Instance,
        parts: Vec<Instance>,
        split_ms: u64,
        start: u64,
    ) -> RunnerResult<PlanningOutcome> {
        let mo = parent.model();
        let mut stats = StaticPartitioningStatistics::new(
            self.params.clone(),
            mo.mapping().nb_nodes(),
            mo.mapping().nb_vms(),
            parent.constraints().len(),
            start,
            self.workers(),
        );
        stats.set_splitting(parts.len(), split_ms);

        let began = Instant::now();
        let mut outcomes = self
            .orchestrator
            .solve_all(Arc::clone(&self.solver), Arc::new(self.params.clone()), parts)
            .await?;
        let solving_ms = u64::try_from(began.elapsed().as_millis()).unwrap_or(u64::MAX);
        stats.set_solving_duration(solving_ms);

        let merged = merge(mo, &outcomes);
        outcomes.sort_by_key(|o| o.partition);
        for o in outcomes {
            stats.add_partition(o.outcome.statistics);
        }
        if !merged.rejected.is_empty() {
            warn!(rejected = merged.rejected.len(), "merged plan is missing partition actions");
        }
        info!(
            partitions = stats.nb_partitions,
            solved = stats.nb_solved(),
            actions = merged.plan.as_ref().map_or(0, Plan::len),
            solving_ms = stats.solving_ms,
            "static partitioning done"
        );
        Ok(PlanningOutcome {
            plan: merged.plan,
            rejected: merged.rejected,
            statistics: stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_constraint::{Constraint, Objective, Offline, Running};
    use rackplan_model::{Model, NodeId, VmId};
    use rackplan_partition::PartitionStrategy;
    use rackplan_solver::LifecycleSolver;

    use crate::error::RunnerError;

    /// node#0 online, node#1 offline, vm#0 and vm#1 ready.
    fn origin() -> (Model, [NodeId; 2], [VmId; 2]) {
        let mut mo = Model::new();
        let ns = [mo.new_node(), mo.new_node()];
        let vms = [mo.new_vm(), mo.new_vm()];
        mo.mapping_mut().add_online_node(ns[0]).unwrap();
        mo.mapping_mut().add_offline_node(ns[1]).unwrap();
        mo.mapping_mut().add_ready_vm(vms[0]).unwrap();
        mo.mapping_mut().add_ready_vm(vms[1]).unwrap();
        (mo, ns, vms)
    }

    /// Sub-instance holding one node and one ready VM.
    fn part(mo: &Model, n: NodeId, vm: VmId, cstrs: Vec<Constraint>) -> Instance {
        let sub = mo
            .sub_model(&[n].into_iter().collect(), &[vm].into_iter().collect())
            .unwrap();
        Instance::new(sub, cstrs, Objective::MinMttr)
    }

    fn driver() -> StaticPartitioning {
        StaticPartitioning::new(Arc::new(LifecycleSolver::new()), Partitioner::new(PartitionStrategy::fixed_size(1)))
    }

    #[test]
    fn test_workers_default_to_host_parallelism() {
        let d = driver();
        assert_eq!(d.workers(), crate::default_workers());
        assert_eq!(d.with_workers(5).workers(), 5);
    }

    #[test]
    fn test_worker_override_keeps_fail_fast() {
        let d = driver().with_fail_fast(true).with_workers(2);
        assert_eq!(d.workers(), 2);
        assert!(d.is_fail_fast());

        let mut config = PlannerConfig::scaffold();
        config.runner.fail_fast = true;
        let d = StaticPartitioning::from_config(&config, Arc::new(LifecycleSolver::new()))
            .unwrap()
            .with_workers(3);
        assert!(d.is_fail_fast());
    }

    #[tokio::test]
    async fn test_solve_given_partitions() {
        let (mo, ns, vms) = origin();
        let parent = Instance::new(mo.clone(), Vec::new(), Objective::MinMttr);
        let parts = vec![
            part(&mo, ns[0], vms[0], vec![Running { vm: vms[0] }.into()]),
            part(&mo, ns[1], vms[1], vec![Running { vm: vms[1] }.into()]),
        ];
        let out = driver().solve_instances(&parent, parts).await.unwrap();
        let res = out.plan.unwrap().result().unwrap();
        assert_eq!(res.mapping().online_nodes().count(), 2);
        assert_eq!(res.mapping().running_vms().count(), 2);
        assert_eq!(out.statistics.nb_partitions, 2);
        assert_eq!(out.statistics.solutions().len(), 1);
    }

    #[tokio::test]
    async fn test_unsolvable_partition_gives_no_plan() {
        let (mo, ns, vms) = origin();
        let parent = Instance::new(mo.clone(), Vec::new(), Objective::MinMttr);
        let parts = vec![
            part(&mo, ns[0], vms[0], vec![Running { vm: vms[0] }.into()]),
            part(
                &mo,
                ns[1],
                vms[1],
                vec![Running { vm: vms[1] }.into(), Offline { node: ns[1] }.into()],
            ),
        ];
        let out = driver().solve_instances(&parent, parts).await.unwrap();
        assert!(out.plan.is_none());
        assert!(out.statistics.solutions().is_empty());
        assert_eq!(out.statistics.nb_solved(), 1);
    }

    #[tokio::test]
    async fn test_foreign_vm_fails_the_run() {
        let (mo, ns, vms) = origin();
        let parent = Instance::new(mo.clone(), Vec::new(), Objective::MinMttr);
        let parts = vec![
            part(&mo, ns[0], vms[0], vec![Running { vm: vms[0] }.into()]),
            part(
                &mo,
                ns[1],
                vms[1],
                vec![Running { vm: vms[1] }.into(), Running { vm: vms[0] }.into()],
            ),
        ];
        let err = driver().solve_instances(&parent, parts).await.unwrap_err();
        assert!(matches!(err, RunnerError::Solver { partition: 1, .. }));
    }
}
