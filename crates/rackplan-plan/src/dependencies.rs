//! Dependency extraction between the actions of a plan.
//!
//! An action demanding resources on a node (a VM arriving, a node going
//! down) depends on the actions freeing resources on that node (a VM
//! leaving, the node coming up) that end before it starts.

use std::collections::BTreeMap;

use rackplan_model::NodeId;

use crate::action::{
    Action, Allocate, BootNode, BootVm, ForgeVm, KillVm, MigrateVm, ResumeVm, ShutdownNode,
    ShutdownVm, SuspendVm,
};
use crate::event::AllocateEvent;
use crate::visitor::ActionVisitor;

/// How an action touches a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    Demanding(NodeId),
    Freeing(NodeId),
}

/// Classifies actions as demanding or freeing per node and answers
/// dependency queries over a fixed action list.
#[derive(Debug, Default)]
pub struct DependenciesExtractor {
    demanding: BTreeMap<NodeId, Vec<usize>>,
    freeing: BTreeMap<NodeId, Vec<usize>>,
}

impl DependenciesExtractor {
    /// Index every action of the list by its footprint.
    pub fn build(actions: &[Action]) -> Self {
        let mut ex = Self::default();
        for (i, a) in actions.iter().enumerate() {
            for fp in a.accept(&mut ex) {
                let (table, node) = match fp {
                    Footprint::Demanding(n) => (&mut ex.demanding, n),
                    Footprint::Freeing(n) => (&mut ex.freeing, n),
                };
                table.entry(node).or_default().push(i);
            }
        }
        ex
    }

    /// Indices of the actions the action at `idx` directly depends on.
    pub fn dependencies(&self, actions: &[Action], idx: usize) -> Vec<usize> {
        let Some(a) = actions.get(idx) else {
            return Vec::new();
        };
        let mut deps: Vec<usize> = self
            .demanding
            .iter()
            .filter(|(_, idxs)| idxs.contains(&idx))
            .flat_map(|(node, _)| self.freeing.get(node).into_iter().flatten())
            .copied()
            .filter(|&j| j != idx && actions[j].end() <= a.start())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    pub fn demanding_on(&self, n: NodeId) -> &[usize] {
        self.demanding.get(&n).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn freeing_on(&self, n: NodeId) -> &[usize] {
        self.freeing.get(&n).map(Vec::as_slice).unwrap_or_default()
    }
}

impl ActionVisitor for DependenciesExtractor {
    type Output = Vec<Footprint>;

    fn visit_allocate(&mut self, _: &Action, op: &Allocate) -> Vec<Footprint> {
        vec![Footprint::Demanding(op.host)]
    }

    fn visit_boot_node(&mut self, _: &Action, op: &BootNode) -> Vec<Footprint> {
        vec![Footprint::Freeing(op.node)]
    }

    fn visit_boot_vm(&mut self, _: &Action, op: &BootVm) -> Vec<Footprint> {
        vec![Footprint::Demanding(op.dst)]
    }

    fn visit_forge_vm(&mut self, _: &Action, _: &ForgeVm) -> Vec<Footprint> {
        Vec::new()
    }

    fn visit_kill_vm(&mut self, _: &Action, op: &KillVm) -> Vec<Footprint> {
        op.host.map(Footprint::Freeing).into_iter().collect()
    }

    fn visit_migrate_vm(&mut self, _: &Action, op: &MigrateVm) -> Vec<Footprint> {
        vec![Footprint::Freeing(op.src), Footprint::Demanding(op.dst)]
    }

    fn visit_resume_vm(&mut self, _: &Action, op: &ResumeVm) -> Vec<Footprint> {
        vec![Footprint::Demanding(op.dst)]
    }

    fn visit_shutdown_node(&mut self, _: &Action, op: &ShutdownNode) -> Vec<Footprint> {
        vec![Footprint::Demanding(op.node)]
    }

    fn visit_shutdown_vm(&mut self, _: &Action, op: &ShutdownVm) -> Vec<Footprint> {
        vec![Footprint::Freeing(op.node)]
    }

    fn visit_suspend_vm(&mut self, _: &Action, op: &SuspendVm) -> Vec<Footprint> {
        vec![Footprint::Freeing(op.src)]
    }

    fn visit_allocate_event(&mut self, _: &AllocateEvent) -> Vec<Footprint> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_model::VmId;

    #[test]
    fn arrival_depends_on_earlier_departure() {
        let (n0, n1) = (NodeId(0), NodeId(1));
        let actions = vec![
            Action::migrate_vm(VmId(0), n0, n1, 10, 0, 3).unwrap(),
            Action::migrate_vm(VmId(1), n1, n0, 10, 4, 6).unwrap(),
            Action::boot_vm(VmId(2), n1, 2, 5).unwrap(),
            Action::shutdown_node(n1, 7, 9).unwrap(),
        ];
        let ex = DependenciesExtractor::build(&actions);

        assert_eq!(ex.demanding_on(n1), &[0, 2, 3]);
        assert_eq!(ex.freeing_on(n1), &[1]);
        // vm#1 leaves n1 at 6; only the shutdown starts after that.
        assert!(ex.dependencies(&actions, 0).is_empty());
        assert!(ex.dependencies(&actions, 2).is_empty());
        assert_eq!(ex.dependencies(&actions, 3), vec![1]);
        // vm#1 lands on n0 at 4, after vm#0 left it at 3.
        assert_eq!(ex.dependencies(&actions, 1), vec![0]);
    }

    #[test]
    fn freeing_actions_have_no_dependencies() {
        let actions = vec![
            Action::boot_node(NodeId(0), 0, 2).unwrap(),
            Action::shutdown_vm(VmId(0), NodeId(0), 3, 4).unwrap(),
        ];
        let ex = DependenciesExtractor::build(&actions);
        assert!(ex.dependencies(&actions, 1).is_empty());
        assert!(ex.dependencies(&actions, 7).is_empty());
    }
}
