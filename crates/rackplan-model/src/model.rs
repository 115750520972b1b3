//! Model — the identifier registry, the mapping and the attached
//! resource views of one cluster snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use crate::element::{ElementRegistry, NodeId, VmId};
use crate::error::{ModelError, ModelResult};
use crate::mapping::Mapping;
use crate::resource::ShareableResource;

/// A cluster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    registry: ElementRegistry,
    mapping: Mapping,
    resources: BTreeMap<String, ShareableResource>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh VM identifier. The VM is not placed in the mapping.
    pub fn new_vm(&mut self) -> VmId {
        self.registry.new_vm()
    }

    /// Issue a fresh node identifier. The node is not placed in the mapping.
    pub fn new_node(&mut self) -> NodeId {
        self.registry.new_node()
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut Mapping {
        &mut self.mapping
    }

    // ── Resources ─────────────────────────────────────────────────

    /// Attach a resource view. Names are unique within a model.
    pub fn attach(&mut self, rc: ShareableResource) -> ModelResult<()> {
        if self.resources.contains_key(rc.name()) {
            return Err(ModelError::DuplicateResource(rc.name().to_string()));
        }
        self.resources.insert(rc.name().to_string(), rc);
        Ok(())
    }

    pub fn detach(&mut self, name: &str) -> ModelResult<ShareableResource> {
        self.resources
            .remove(name)
            .ok_or_else(|| ModelError::UnknownResource(name.to_string()))
    }

    pub fn resource(&self, name: &str) -> Option<&ShareableResource> {
        self.resources.get(name)
    }

    pub fn resource_mut(&mut self, name: &str) -> ModelResult<&mut ShareableResource> {
        self.resources
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownResource(name.to_string()))
    }

    pub fn resources(&self) -> impl Iterator<Item = &ShareableResource> {
        self.resources.values()
    }

    // ── Partitioning support ──────────────────────────────────────

    /// Carve the sub-model of a node scope out of this model.
    ///
    /// The sub-model holds the scoped nodes, the VMs they host and the
    /// given ready VMs. It keeps the whole identifier registry and every
    /// resource view, so identifiers stay reserved and actions produced
    /// on it replay unchanged on this model.
    pub fn sub_model(&self, scope: &BTreeSet<NodeId>, ready: &BTreeSet<VmId>) -> ModelResult<Model> {
        if let Some(&n) = scope.iter().find(|n| !self.registry.contains_node(**n)) {
            return Err(ModelError::UndeclaredNode(n));
        }
        if let Some(&vm) = ready.iter().find(|vm| !self.registry.contains_vm(**vm)) {
            return Err(ModelError::UndeclaredVm(vm));
        }
        let mapping = self.mapping.restrict(scope, ready);
        trace!(
            nodes = mapping.nb_nodes(),
            vms = mapping.nb_vms(),
            "sub-model carved"
        );
        Ok(Model {
            registry: self.registry.clone(),
            mapping,
            resources: self.resources.clone(),
        })
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mapping)?;
        for rc in self.resources.values() {
            writeln!(f, "{rc}")?;
        }
        Ok(())
    }
}
