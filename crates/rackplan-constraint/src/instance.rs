//! Instance — a model, the constraints to satisfy on it, and the
//! optimization goal. The unit handed to a solver.

use std::fmt;

use rackplan_model::Model;
use tracing::debug;

use crate::constraint::{Constraint, SatConstraint};
use crate::error::{ConstraintError, ConstraintResult};

/// What a solver should minimize among valid plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Objective {
    /// Mean time to repair: the sum of the action end times.
    #[default]
    MinMttr,
    /// Number of migrations.
    MinMigrations,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::MinMttr => f.write_str("minMTTR"),
            Objective::MinMigrations => f.write_str("minMigrations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: Model,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Instance {
    pub fn new(model: Model, constraints: Vec<Constraint>, objective: Objective) -> Self {
        Self {
            model,
            constraints,
            objective,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn into_parts(self) -> (Model, Vec<Constraint>, Objective) {
        (self.model, self.constraints, self.objective)
    }

    /// Check every constraint only references elements the model declares.
    pub fn validate(&self) -> ConstraintResult<()> {
        let reg = self.model.registry();
        for c in &self.constraints {
            if let Some(vm) = c.involved_vms().into_iter().find(|vm| !reg.contains_vm(*vm)) {
                debug!(constraint = %c, %vm, "unknown VM");
                return Err(ConstraintError::UnknownVm {
                    constraint: c.to_string(),
                    vm,
                });
            }
            if let Some(node) = c
                .involved_nodes()
                .into_iter()
                .find(|n| !reg.contains_node(*n))
            {
                debug!(constraint = %c, %node, "unknown node");
                return Err(ConstraintError::UnknownNode {
                    constraint: c.to_string(),
                    node,
                });
            }
        }
        Ok(())
    }

    /// Constraints the model violates, in the discrete sense.
    pub fn unsatisfied<'a>(&'a self, mo: &'a Model) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints.iter().filter(move |c| !c.is_satisfied(mo))
    }
}
