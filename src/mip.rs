//! Mixed-integer search layer.
//!
//! The decomposition never talks to a concrete engine. It builds a [`MipModel`], hands it to a
//! [`SearchDriver`] together with a [`LazyConstraintHandler`], and reacts to the
//! [`SearchEvent`]s the driver raises. Constraints travel back as the handler's return value;
//! the driver appends them to its global constraint set and keeps them for the rest of the
//! search.

pub mod branch_and_cut;
pub mod settings;

use std::time::Duration;

use crate::error::Result;
use crate::lp::{LinearConstraint, LpStatus};

pub use branch_and_cut::BranchAndCut;
pub use settings::MipSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub lower: f64,
    pub upper: f64,
    pub objective: f64,
    pub integer: bool,
    pub name: String,
}

impl Variable {
    pub fn continuous(lower: f64, upper: f64, objective: f64, name: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            objective,
            integer: false,
            name: name.into(),
        }
    }

    pub fn binary(objective: f64, name: impl Into<String>) -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
            objective,
            integer: true,
            name: name.into(),
        }
    }
}

/// A minimisation model over bounded variables and linear rows.
#[derive(Debug, Clone, Default)]
pub struct MipModel {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: Vec<LinearConstraint>,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_variable(&mut self, variable: Variable) -> usize {
        self.variables.push(variable);
        self.variables.len() - 1
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(x)
            .map(|(v, value)| v.objective * value)
            .sum()
    }

    pub fn integer_vars(&self) -> impl Iterator<Item = usize> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.integer)
            .map(|(j, _)| j)
    }
}

/// Something that happened during the search which the handler may answer with constraints.
#[derive(Debug, Clone, Copy)]
pub enum SearchEvent<'a> {
    /// A candidate whose integer variables are all integral.
    ///
    /// Returned constraints violated by `values` reject the candidate; the node is re-solved.
    IntegerSolution {
        values: &'a [f64],
        objective: f64,
        node: u64,
    },
    /// A node relaxation was solved. `values` are only meaningful when `status` is `Optimal`.
    RelaxationNode {
        status: LpStatus,
        values: &'a [f64],
        objective: f64,
        node: u64,
    },
}

impl SearchEvent<'_> {
    pub fn node(&self) -> u64 {
        match *self {
            SearchEvent::IntegerSolution { node, .. } | SearchEvent::RelaxationNode { node, .. } => {
                node
            }
        }
    }
}

/// Receives search events and answers them with constraints to inject.
///
/// Every returned constraint must be globally valid: drivers keep it for all remaining nodes.
/// An error aborts the whole search.
pub trait LazyConstraintHandler {
    fn on_event(&mut self, event: SearchEvent<'_>) -> Result<Vec<LinearConstraint>>;
}

/// A handler that never adds anything; useful for solving plain models.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLazyConstraints;

impl LazyConstraintHandler for NoLazyConstraints {
    fn on_event(&mut self, _event: SearchEvent<'_>) -> Result<Vec<LinearConstraint>> {
        Ok(Vec::new())
    }
}

/// `Optimal` means optimal within the configured gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NodeLimit,
    TimeLimit,
}

impl MipStatus {
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            MipStatus::Optimal | MipStatus::NodeLimit | MipStatus::TimeLimit
        )
    }
}

/// What a finished search reports back.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub status: MipStatus,
    /// Incumbent values; empty if no incumbent was found.
    pub values: Vec<f64>,
    pub objective: f64,
    pub best_bound: f64,
    pub nodes_explored: u64,
    pub lazy_constraints: usize,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn has_incumbent(&self) -> bool {
        !self.values.is_empty()
    }
}

/// A branch-and-bound engine that supports lazy constraints.
pub trait SearchDriver {
    fn optimize(
        &mut self,
        model: &MipModel,
        handler: &mut dyn LazyConstraintHandler,
    ) -> Result<SearchOutcome>;
}
