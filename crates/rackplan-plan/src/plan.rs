//! Reconfiguration plan — an origin model plus the timed actions that
//! transform it.

use std::fmt;

use rackplan_model::{Model, NodeId, VmId};
use tracing::debug;

use crate::action::Action;
use crate::dependencies::DependenciesExtractor;
use crate::error::{PlanError, PlanResult};
use crate::event::{Event, Hook};

/// An ordered, appendable collection of actions over an origin model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    origin: Model,
    actions: Vec<Action>,
}

impl Plan {
    pub fn new(origin: Model) -> Self {
        Self {
            origin,
            actions: Vec::new(),
        }
    }

    pub fn origin(&self) -> &Model {
        &self.origin
    }

    /// Append an action.
    ///
    /// Returns `false` and leaves the plan unchanged when the action is
    /// already in the plan, references an element the origin model does
    /// not know, or overlaps in time another action governing the same VM
    /// or node.
    pub fn add(&mut self, a: Action) -> bool {
        if self.actions.contains(&a) {
            debug!(action = %a, "duplicate action rejected");
            return false;
        }
        if let Some(unknown) = self.unknown_element(&a) {
            debug!(action = %a, element = %unknown, "action references an unknown element");
            return false;
        }
        let (vm, node) = governed(&a);
        let clash = self.actions.iter().find(|b| {
            let (bvm, bnode) = governed(b);
            let same = (vm.is_some() && vm == bvm) || (node.is_some() && node == bnode);
            same && a.overlaps(b)
        });
        if let Some(b) = clash {
            debug!(action = %a, with = %b, "overlapping action rejected");
            return false;
        }
        self.actions.push(a);
        true
    }

    fn unknown_element(&self, a: &Action) -> Option<String> {
        let reg = self.origin.registry();
        let op = a.operation();
        if let Some(vm) = op.vm().filter(|vm| !reg.contains_vm(*vm)) {
            return Some(vm.to_string());
        }
        if let Some(n) = op.nodes().into_iter().find(|n| !reg.contains_node(*n)) {
            return Some(n.to_string());
        }
        [Hook::Pre, Hook::Post]
            .into_iter()
            .flat_map(|h| a.events(h))
            .map(|ev| match ev {
                Event::Allocate(e) => e.vm,
            })
            .find(|vm| !reg.contains_vm(*vm))
            .map(|vm| vm.to_string())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Moment the last action ends, 0 for an empty plan.
    pub fn duration(&self) -> u32 {
        self.actions.iter().map(Action::end).max().unwrap_or(0)
    }

    /// Indices of the actions in application order: by start, then end,
    /// then insertion.
    fn schedule(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.actions.len()).collect();
        order.sort_by_key(|&i| (self.actions[i].start(), self.actions[i].end()));
        order
    }

    /// Replay every action on a copy of the origin model.
    pub fn replay(&self) -> PlanResult<Model> {
        let mut mo = self.origin.clone();
        for i in self.schedule() {
            let a = &self.actions[i];
            if !a.apply(&mut mo) {
                debug!(index = i, action = %a, "replay stopped");
                return Err(PlanError::NotApplicable {
                    index: i,
                    action: a.to_string(),
                });
            }
        }
        Ok(mo)
    }

    /// The model resulting from the plan, `None` when some action is not
    /// applicable when its turn comes.
    pub fn result(&self) -> Option<Model> {
        self.replay().ok()
    }

    pub fn is_applyable(&self) -> bool {
        self.replay().is_ok()
    }

    /// Actions the given action directly depends on.
    pub fn direct_dependencies(&self, a: &Action) -> Vec<&Action> {
        let Some(idx) = self.actions.iter().position(|b| b == a) else {
            return Vec::new();
        };
        DependenciesExtractor::build(&self.actions)
            .dependencies(&self.actions, idx)
            .into_iter()
            .map(|j| &self.actions[j])
            .collect()
    }
}

/// The VM and the node whose state an action changes.
fn governed(a: &Action) -> (Option<VmId>, Option<NodeId>) {
    let op = a.operation();
    (op.vm(), op.node_transition().map(|t| t.node))
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in self.schedule() {
            writeln!(f, "{}", self.actions[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_model::VmState;

    fn origin() -> (Model, NodeId, NodeId, VmId) {
        let mut mo = Model::new();
        let n0 = mo.new_node();
        let n1 = mo.new_node();
        let vm = mo.new_vm();
        mo.mapping_mut().add_online_node(n0).unwrap();
        mo.mapping_mut().add_offline_node(n1).unwrap();
        mo.mapping_mut().add_running_vm(vm, n0).unwrap();
        (mo, n0, n1, vm)
    }

    #[test]
    fn add_rejects_duplicates_unknowns_and_overlaps() {
        let (mo, n0, n1, vm) = origin();
        let mut plan = Plan::new(mo);

        let boot = Action::boot_node(n1, 0, 5).unwrap();
        assert!(plan.add(boot.clone()));
        assert!(!plan.add(boot));
        assert!(!plan.add(Action::boot_node(NodeId(9), 0, 5).unwrap()));
        assert!(!plan.add(Action::shutdown_node(n1, 3, 6).unwrap()));

        let migrate = Action::migrate_vm(vm, n0, n1, 100, 5, 8).unwrap();
        assert!(plan.add(migrate));
        assert!(!plan.add(Action::shutdown_vm(vm, n1, 7, 9).unwrap()));
        assert!(plan.add(Action::shutdown_vm(vm, n1, 8, 9).unwrap()));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.duration(), 9);
    }

    #[test]
    fn replay_follows_start_order() {
        let (mo, n0, n1, vm) = origin();
        let mut plan = Plan::new(mo);
        // Inserted out of order on purpose.
        assert!(plan.add(Action::shutdown_node(n0, 8, 10).unwrap()));
        assert!(plan.add(Action::migrate_vm(vm, n0, n1, 100, 5, 8).unwrap()));
        assert!(plan.add(Action::boot_node(n1, 0, 5).unwrap()));

        let res = plan.result().unwrap();
        assert_eq!(res.mapping().vm_state(vm), Some(VmState::Running(n1)));
        assert!(res.mapping().is_offline(n0));
        // The origin is left alone.
        assert!(plan.origin().mapping().is_online(n0));

        let shown = plan.to_string();
        assert!(shown.starts_with("0:5 bootNode(node=node#1)\n"));
    }

    #[test]
    fn replay_reports_the_blocking_action() {
        let (mo, n0, n1, vm) = origin();
        let mut plan = Plan::new(mo);
        assert!(plan.add(Action::migrate_vm(vm, n0, n1, 100, 0, 3).unwrap()));
        assert!(plan.result().is_none());
        assert!(matches!(
            plan.replay(),
            Err(PlanError::NotApplicable { index: 0, .. })
        ));
    }

    #[test]
    fn direct_dependencies_link_departures_to_arrivals() {
        let (mo, n0, n1, vm) = origin();
        let mut plan = Plan::new(mo);
        let boot = Action::boot_node(n1, 0, 5).unwrap();
        let migrate = Action::migrate_vm(vm, n0, n1, 100, 5, 8).unwrap();
        let halt = Action::shutdown_node(n0, 8, 10).unwrap();
        assert!(plan.add(boot.clone()));
        assert!(plan.add(migrate.clone()));
        assert!(plan.add(halt.clone()));

        assert_eq!(plan.direct_dependencies(&migrate), vec![&boot]);
        assert_eq!(plan.direct_dependencies(&halt), vec![&migrate]);
        assert!(plan.direct_dependencies(&boot).is_empty());
    }
}
