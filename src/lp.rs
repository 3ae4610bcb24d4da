//! Linear programming model and solver interface.
//!
//! Programs are always minimisations of `c^T x` over general rows `a x {<=, >=, =} b` and
//! finite lower / possibly infinite upper variable bounds. Solvers report the dual price of
//! every row as `dz*/db`, so a `>=` row has a non-negative dual and a `<=` row a non-positive
//! one.

pub mod simplex;

use crate::error::Result;

pub use simplex::{Simplex, SimplexSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// A sparse linear row `sum coefs[k].1 * x[coefs[k].0]  (sense)  rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub coefs: Vec<(usize, f64)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
    pub name: Option<String>,
}

impl LinearConstraint {
    pub fn new(coefs: Vec<(usize, f64)>, sense: ConstraintSense, rhs: f64) -> Self {
        Self {
            coefs,
            sense,
            rhs,
            name: None,
        }
    }

    pub fn less_equal(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, ConstraintSense::LessEqual, rhs)
    }

    pub fn greater_equal(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, ConstraintSense::GreaterEqual, rhs)
    }

    pub fn equal(coefs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self::new(coefs, ConstraintSense::Equal, rhs)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Left-hand side value at `x`.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefs.iter().map(|&(j, a)| a * x[j]).sum()
    }

    /// How far `x` is from satisfying the row; positive means violated.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.activity(x);
        match self.sense {
            ConstraintSense::LessEqual => lhs - self.rhs,
            ConstraintSense::GreaterEqual => self.rhs - lhs,
            ConstraintSense::Equal => (lhs - self.rhs).abs(),
        }
    }

    pub fn is_satisfied(&self, x: &[f64], tol: f64) -> bool {
        self.violation(x) <= tol
    }

    /// Largest variable index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.coefs.iter().map(|&(j, _)| j).max()
    }
}

/// `min c^T x` subject to `constraints` and `lower <= x <= upper`.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl LinearProgram {
    /// A program over `objective.len()` non-negative, unbounded-above variables.
    pub fn new(objective: Vec<f64>) -> Self {
        let n = objective.len();
        Self {
            objective,
            constraints: Vec::new(),
            lower: vec![0.0; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: LpStatus,
    /// Objective value; only meaningful when `status` is `Optimal`.
    pub objective: f64,
    pub values: Vec<f64>,
    /// One dual price per row of the program, in row order.
    pub duals: Vec<f64>,
    pub iterations: usize,
}

impl LpSolution {
    pub fn with_status(status: LpStatus, iterations: usize) -> Self {
        Self {
            status,
            objective: match status {
                LpStatus::Unbounded => f64::NEG_INFINITY,
                _ => f64::INFINITY,
            },
            values: Vec::new(),
            duals: Vec::new(),
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == LpStatus::Optimal
    }
}

/// Anything that can solve a [`LinearProgram`] to optimality and report row duals.
///
/// Infeasible or unbounded programs are reported through [`LpSolution::status`]; an `Err` means
/// the program itself was malformed.
pub trait LpSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_by_sense() {
        let x = [1.0, 2.0];
        let le = LinearConstraint::less_equal(vec![(0, 1.0), (1, 1.0)], 2.5);
        let ge = LinearConstraint::greater_equal(vec![(0, 1.0), (1, 1.0)], 2.5);
        let eq = LinearConstraint::equal(vec![(0, 2.0)], 1.0);

        assert!((le.violation(&x) - 0.5).abs() < 1e-12);
        assert!((ge.violation(&x) + 0.5).abs() < 1e-12);
        assert!((eq.violation(&x) - 1.0).abs() < 1e-12);
        assert!(ge.is_satisfied(&x, 1e-9));
        assert!(!le.is_satisfied(&x, 1e-9));
        assert_eq!(le.max_index(), Some(1));
    }
}
