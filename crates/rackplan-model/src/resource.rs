//! Shareable resources — per-node capacities and per-VM consumptions
//! for a named resource such as `cpu` or `mem`.

use std::collections::BTreeMap;
use std::fmt;

use crate::element::{NodeId, VmId};

/// Default capacity of a node when none was set.
pub const DEFAULT_CAPACITY: u32 = 0;

/// Default consumption of a VM when none was set.
pub const DEFAULT_CONSUMPTION: u32 = 0;

/// A named resource view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareableResource {
    name: String,
    default_capacity: u32,
    default_consumption: u32,
    capacities: BTreeMap<NodeId, u32>,
    consumptions: BTreeMap<VmId, u32>,
}

impl ShareableResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_defaults(name, DEFAULT_CAPACITY, DEFAULT_CONSUMPTION)
    }

    pub fn with_defaults(name: impl Into<String>, capacity: u32, consumption: u32) -> Self {
        Self {
            name: name.into(),
            default_capacity: capacity,
            default_consumption: consumption,
            capacities: BTreeMap::new(),
            consumptions: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    pub fn default_consumption(&self) -> u32 {
        self.default_consumption
    }

    /// Capacity of a node, falling back to the default.
    pub fn capacity(&self, n: NodeId) -> u32 {
        self.capacities.get(&n).copied().unwrap_or(self.default_capacity)
    }

    /// Consumption of a VM, falling back to the default.
    pub fn consumption(&self, vm: VmId) -> u32 {
        self.consumptions
            .get(&vm)
            .copied()
            .unwrap_or(self.default_consumption)
    }

    pub fn set_capacity(&mut self, n: NodeId, amount: u32) -> &mut Self {
        self.capacities.insert(n, amount);
        self
    }

    pub fn set_consumption(&mut self, vm: VmId, amount: u32) -> &mut Self {
        self.consumptions.insert(vm, amount);
        self
    }

    pub fn unset_capacity(&mut self, n: NodeId) {
        self.capacities.remove(&n);
    }

    pub fn unset_consumption(&mut self, vm: VmId) {
        self.consumptions.remove(&vm);
    }

    /// Whether a capacity was explicitly set for the node.
    pub fn defines_capacity(&self, n: NodeId) -> bool {
        self.capacities.contains_key(&n)
    }

    /// Whether a consumption was explicitly set for the VM.
    pub fn defines_consumption(&self, vm: VmId) -> bool {
        self.consumptions.contains_key(&vm)
    }

    /// Sum of the consumptions of the given VMs.
    pub fn sum_consumptions(&self, vms: impl IntoIterator<Item = VmId>) -> u64 {
        vms.into_iter().map(|vm| u64::from(self.consumption(vm))).sum()
    }

    /// Sum of the capacities of the given nodes.
    pub fn sum_capacities(&self, nodes: impl IntoIterator<Item = NodeId>) -> u64 {
        nodes.into_iter().map(|n| u64::from(self.capacity(n))).sum()
    }
}

impl fmt::Display for ShareableResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc:{}:", self.name)?;
        let mut first = true;
        for (n, c) in &self.capacities {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "<{n},{c}>")?;
            first = false;
        }
        for (vm, c) in &self.consumptions {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "<{vm},{c}>")?;
            first = false;
        }
        Ok(())
    }
}
