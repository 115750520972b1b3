//! Mapping — the authoritative placement of VMs and node states.
//!
//! A VM's lifecycle state and its hosting node are stored together in a
//! single [`VmState`] value, so the two can never disagree. The per-node
//! host sets are a derived index kept in sync by the mutators; empty
//! index entries are pruned so that two mappings describing the same
//! placement always compare equal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::element::{NodeId, VmId};
use crate::error::{MappingError, MappingResult};

/// State of a VM that is present in the mapping.
///
/// A VM absent from the mapping is either not yet materialized (`init`)
/// or terminated (`killed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmState {
    /// Materialized but not placed.
    Ready,
    /// Running on an online node.
    Running(NodeId),
    /// Suspended to disk on an online node.
    Sleeping(NodeId),
}

impl VmState {
    /// The hosting node, if the VM is placed.
    pub fn host(&self) -> Option<NodeId> {
        match self {
            VmState::Ready => None,
            VmState::Running(n) | VmState::Sleeping(n) => Some(*n),
        }
    }

    pub fn kind(&self) -> VmStateKind {
        match self {
            VmState::Ready => VmStateKind::Ready,
            VmState::Running(_) => VmStateKind::Running,
            VmState::Sleeping(_) => VmStateKind::Sleeping,
        }
    }
}

/// Lifecycle state of a VM without placement, including the two states
/// that have no entry in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmStateKind {
    Init,
    Ready,
    Running,
    Sleeping,
    Killed,
}

impl fmt::Display for VmStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmStateKind::Init => "init",
            VmStateKind::Ready => "ready",
            VmStateKind::Running => "running",
            VmStateKind::Sleeping => "sleeping",
            VmStateKind::Killed => "killed",
        };
        f.write_str(s)
    }
}

/// State of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Online,
    Offline,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Online => f.write_str("online"),
            NodeState::Offline => f.write_str("offline"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Hosted {
    running: BTreeSet<VmId>,
    sleeping: BTreeSet<VmId>,
}

impl Hosted {
    fn is_empty(&self) -> bool {
        self.running.is_empty() && self.sleeping.is_empty()
    }
}

/// Placement of every VM and state of every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    online: BTreeSet<NodeId>,
    offline: BTreeSet<NodeId>,
    vms: BTreeMap<VmId, VmState>,
    hosted: BTreeMap<NodeId, Hosted>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Node mutators ─────────────────────────────────────────────

    /// Set a node online. Always succeeds.
    pub fn add_online_node(&mut self, n: NodeId) -> MappingResult<()> {
        self.offline.remove(&n);
        self.online.insert(n);
        Ok(())
    }

    /// Set a node offline. Refused while the node hosts VMs.
    pub fn add_offline_node(&mut self, n: NodeId) -> MappingResult<()> {
        if self.hosts_vms(n) {
            return Err(MappingError::NodeNotEmpty(n));
        }
        self.online.remove(&n);
        self.offline.insert(n);
        Ok(())
    }

    /// Remove a node from the mapping. Refused while the node hosts VMs.
    pub fn remove_node(&mut self, n: NodeId) -> MappingResult<()> {
        if !self.contains_node(n) {
            return Err(MappingError::UnknownNode(n));
        }
        if self.hosts_vms(n) {
            return Err(MappingError::NodeNotEmpty(n));
        }
        self.online.remove(&n);
        self.offline.remove(&n);
        Ok(())
    }

    // ── VM mutators ───────────────────────────────────────────────

    /// Place a VM in the running state on an online node, whatever its
    /// previous state.
    pub fn add_running_vm(&mut self, vm: VmId, n: NodeId) -> MappingResult<()> {
        if !self.online.contains(&n) {
            return Err(MappingError::NodeNotOnline(n));
        }
        self.unhost(vm);
        self.vms.insert(vm, VmState::Running(n));
        self.hosted.entry(n).or_default().running.insert(vm);
        Ok(())
    }

    /// Place a VM in the sleeping state on an online node, whatever its
    /// previous state.
    pub fn add_sleeping_vm(&mut self, vm: VmId, n: NodeId) -> MappingResult<()> {
        if !self.online.contains(&n) {
            return Err(MappingError::NodeNotOnline(n));
        }
        self.unhost(vm);
        self.vms.insert(vm, VmState::Sleeping(n));
        self.hosted.entry(n).or_default().sleeping.insert(vm);
        Ok(())
    }

    /// Set a VM ready (unplaced). Always succeeds.
    pub fn add_ready_vm(&mut self, vm: VmId) -> MappingResult<()> {
        self.unhost(vm);
        self.vms.insert(vm, VmState::Ready);
        Ok(())
    }

    /// Remove a VM from the mapping.
    pub fn remove_vm(&mut self, vm: VmId) -> MappingResult<()> {
        if !self.vms.contains_key(&vm) {
            return Err(MappingError::UnknownVm(vm));
        }
        self.unhost(vm);
        self.vms.remove(&vm);
        Ok(())
    }

    /// Drop the VM from the host index of its current node, if any.
    fn unhost(&mut self, vm: VmId) {
        let Some(host) = self.vms.get(&vm).and_then(VmState::host) else {
            return;
        };
        if let Some(h) = self.hosted.get_mut(&host) {
            h.running.remove(&vm);
            h.sleeping.remove(&vm);
            if h.is_empty() {
                self.hosted.remove(&host);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn is_online(&self, n: NodeId) -> bool {
        self.online.contains(&n)
    }

    pub fn is_offline(&self, n: NodeId) -> bool {
        self.offline.contains(&n)
    }

    pub fn node_state(&self, n: NodeId) -> Option<NodeState> {
        if self.online.contains(&n) {
            Some(NodeState::Online)
        } else if self.offline.contains(&n) {
            Some(NodeState::Offline)
        } else {
            None
        }
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.online.contains(&n) || self.offline.contains(&n)
    }

    pub fn contains_vm(&self, vm: VmId) -> bool {
        self.vms.contains_key(&vm)
    }

    pub fn vm_state(&self, vm: VmId) -> Option<VmState> {
        self.vms.get(&vm).copied()
    }

    pub fn vm_location(&self, vm: VmId) -> Option<NodeId> {
        self.vms.get(&vm).and_then(VmState::host)
    }

    pub fn is_running(&self, vm: VmId) -> bool {
        matches!(self.vms.get(&vm), Some(VmState::Running(_)))
    }

    pub fn is_sleeping(&self, vm: VmId) -> bool {
        matches!(self.vms.get(&vm), Some(VmState::Sleeping(_)))
    }

    pub fn is_ready(&self, vm: VmId) -> bool {
        matches!(self.vms.get(&vm), Some(VmState::Ready))
    }

    /// Whether the node hosts running or sleeping VMs.
    pub fn hosts_vms(&self, n: NodeId) -> bool {
        self.hosted.get(&n).is_some_and(|h| !h.is_empty())
    }

    pub fn running_vms_on(&self, n: NodeId) -> impl Iterator<Item = VmId> + '_ {
        self.hosted
            .get(&n)
            .into_iter()
            .flat_map(|h| h.running.iter().copied())
    }

    pub fn sleeping_vms_on(&self, n: NodeId) -> impl Iterator<Item = VmId> + '_ {
        self.hosted
            .get(&n)
            .into_iter()
            .flat_map(|h| h.sleeping.iter().copied())
    }

    pub fn nb_running_vms_on(&self, n: NodeId) -> usize {
        self.hosted.get(&n).map_or(0, |h| h.running.len())
    }

    pub fn online_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.online.iter().copied()
    }

    pub fn offline_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.offline.iter().copied()
    }

    /// Every node, in ascending identifier order.
    pub fn all_nodes(&self) -> BTreeSet<NodeId> {
        self.online.union(&self.offline).copied().collect()
    }

    /// Every VM present in the mapping, in ascending identifier order.
    pub fn all_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms.keys().copied()
    }

    pub fn ready_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms
            .iter()
            .filter(|(_, st)| matches!(st, VmState::Ready))
            .map(|(vm, _)| *vm)
    }

    pub fn running_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms
            .iter()
            .filter(|(_, st)| matches!(st, VmState::Running(_)))
            .map(|(vm, _)| *vm)
    }

    pub fn sleeping_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.vms
            .iter()
            .filter(|(_, st)| matches!(st, VmState::Sleeping(_)))
            .map(|(vm, _)| *vm)
    }

    pub fn nb_vms(&self) -> usize {
        self.vms.len()
    }

    pub fn nb_nodes(&self) -> usize {
        self.online.len() + self.offline.len()
    }

    /// Copy the part of the mapping covering a node scope: the scoped
    /// nodes, the VMs they host, and the given ready VMs.
    ///
    /// Nodes of the scope that are not in this mapping are ignored.
    pub fn restrict(&self, scope: &BTreeSet<NodeId>, ready: &BTreeSet<VmId>) -> Mapping {
        let mut sub = Mapping::new();
        for &n in scope {
            if self.online.contains(&n) {
                sub.online.insert(n);
                if let Some(h) = self.hosted.get(&n) {
                    for &vm in h.running.iter().chain(h.sleeping.iter()) {
                        if let Some(st) = self.vms.get(&vm) {
                            sub.vms.insert(vm, *st);
                        }
                    }
                    sub.hosted.insert(n, h.clone());
                }
            } else if self.offline.contains(&n) {
                sub.offline.insert(n);
            }
        }
        for &vm in ready {
            sub.vms.insert(vm, VmState::Ready);
        }
        sub
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &n in &self.online {
            write!(f, "{n}:")?;
            if !self.hosts_vms(n) {
                write!(f, " -")?;
            }
            for vm in self.running_vms_on(n) {
                write!(f, " {vm}")?;
            }
            for vm in self.sleeping_vms_on(n) {
                write!(f, " ({vm})")?;
            }
            writeln!(f)?;
        }
        for &n in &self.offline {
            writeln!(f, "({n})")?;
        }
        write!(f, "READY")?;
        for vm in self.ready_vms() {
            write!(f, " {vm}")?;
        }
        writeln!(f)
    }
}
