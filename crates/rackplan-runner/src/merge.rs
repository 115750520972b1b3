//! Merging of partition plans.

use rackplan_model::Model;
use rackplan_plan::{Action, Plan};
use tracing::{debug, error};

use crate::orchestrator::PartitionOutcome;

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged plan, `None` when some partition has no plan.
    pub plan: Option<Plan>,
    /// Actions the merged plan refused.
    pub rejected: Vec<Action>,
}

/// Append the actions of every partition plan, by partition order, to a
/// plan over the parent model.
///
/// The merge is best-effort: an action conflicting with an action already
/// added is logged and set aside, the merge goes on.
pub fn merge(origin: &Model, outcomes: &[PartitionOutcome]) -> MergeOutcome {
    let mut ordered: Vec<&PartitionOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|o| o.partition);

    if let Some(unsolved) = ordered.iter().find(|o| o.outcome.plan.is_none()) {
        debug!(partition = unsolved.partition, "partition without plan, nothing to merge");
        return MergeOutcome {
            plan: None,
            rejected: Vec::new(),
        };
    }

    let mut plan = Plan::new(origin.clone());
    let mut rejected = Vec::new();
    for o in ordered {
        for a in o.outcome.plan.iter().flatten() {
            if !plan.add(a.clone()) {
                error!(partition = o.partition, action = %a, "unable to add action while merging the sub-plans");
                rejected.push(a.clone());
            }
        }
    }
    MergeOutcome {
        plan: Some(plan),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_model::{NodeId, VmId};
    use rackplan_solver::{Parameters, SolveOutcome, SolvingStatistics};

    fn origin() -> (Model, Vec<NodeId>, Vec<VmId>) {
        let mut mo = Model::new();
        let ns: Vec<NodeId> = (0..4).map(|_| mo.new_node()).collect();
        let vms: Vec<VmId> = (0..4).map(|_| mo.new_vm()).collect();
        for (k, &n) in ns.iter().enumerate() {
            mo.mapping_mut().add_online_node(n).unwrap();
            mo.mapping_mut().add_ready_vm(vms[k]).unwrap();
        }
        (mo, ns, vms)
    }

    fn outcome(partition: usize, mo: &Model, actions: Vec<Action>) -> PartitionOutcome {
        let mut plan = Plan::new(mo.clone());
        for a in actions {
            assert!(plan.add(a));
        }
        PartitionOutcome {
            partition,
            outcome: SolveOutcome {
                plan: Some(plan),
                statistics: SolvingStatistics::new(Parameters::default(), 1, 1, 0),
            },
        }
    }

    #[test]
    fn disjoint_plans_add_up() {
        let (mo, ns, vms) = origin();
        let outcomes: Vec<PartitionOutcome> = (0..4)
            .rev()
            .map(|k| outcome(k, &mo, vec![Action::boot_vm(vms[k], ns[k], 0, 3).unwrap()]))
            .collect();
        let merged = merge(&mo, &outcomes);
        assert!(merged.rejected.is_empty());
        let plan = merged.plan.unwrap();
        assert_eq!(plan.len(), 4);
        // Partition order, whatever the completion order.
        assert_eq!(plan.actions()[0], Action::boot_vm(vms[0], ns[0], 0, 3).unwrap());
        assert_eq!(plan.result().unwrap().mapping().running_vms().count(), 4);
    }

    #[test]
    fn conflicting_actions_are_set_aside() {
        let (mo, ns, vms) = origin();
        let outcomes = vec![
            outcome(0, &mo, vec![Action::boot_vm(vms[0], ns[0], 0, 3).unwrap()]),
            outcome(1, &mo, vec![Action::boot_vm(vms[0], ns[1], 1, 4).unwrap()]),
        ];
        let merged = merge(&mo, &outcomes);
        assert_eq!(merged.plan.unwrap().len(), 1);
        assert_eq!(merged.rejected, vec![Action::boot_vm(vms[0], ns[1], 1, 4).unwrap()]);
    }

    #[test]
    fn any_unsolved_partition_means_no_plan() {
        let (mo, ns, vms) = origin();
        let mut unsolved = outcome(1, &mo, Vec::new());
        unsolved.outcome.plan = None;
        let outcomes = vec![
            outcome(0, &mo, vec![Action::boot_vm(vms[0], ns[0], 0, 3).unwrap()]),
            unsolved,
        ];
        assert!(merge(&mo, &outcomes).plan.is_none());
    }
}
