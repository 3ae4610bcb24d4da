//! Optimality cuts from transportation duals.
//!
//! For any opening `y` the subproblem value satisfies
//! `Q(y) >= sum_i d[i] mu[i] + sum_j u[j] nu[j] y[j]`, with equality at the opening the duals
//! came from. With `nu[j] <= 0` this reads `eta >= sum d mu - sum u |nu| y`: opening a facility
//! can only lower the estimate.

use super::subproblem::SubproblemResult;
use super::MasterLayout;
use crate::instance::Instance;
use crate::lp::LinearConstraint;

/// Where in the search a cut was separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutOrigin {
    IntegerFeasible,
    Fractional,
}

/// `eta >= constant + sum_j slopes[j] * y[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalityCut {
    /// `sum_i d[i] mu[i]`.
    pub constant: f64,
    /// `u[j] nu[j]`, never positive.
    pub slopes: Vec<f64>,
    pub origin: CutOrigin,
}

impl OptimalityCut {
    /// Lower bound the cut places on `eta` at opening `y`.
    pub fn bound_at(&self, y: &[f64]) -> f64 {
        self.constant + self.slopes.iter().zip(y).map(|(s, y)| s * y).sum::<f64>()
    }

    /// Amount by which `(y, eta)` violates the cut; positive means cut off.
    pub fn violation(&self, y: &[f64], eta: f64) -> f64 {
        self.bound_at(y) - eta
    }

    /// `eta - sum_j slopes[j] y[j] >= constant` over the master variables.
    pub fn to_constraint(&self, layout: MasterLayout) -> LinearConstraint {
        let mut coefs = Vec::with_capacity(self.slopes.len() + 1);
        coefs.push((layout.eta(), 1.0));
        coefs.extend(
            self.slopes
                .iter()
                .enumerate()
                .filter(|(_, s)| **s != 0.0)
                .map(|(j, s)| (layout.y(j), -s)),
        );
        LinearConstraint::greater_equal(coefs, self.constant).with_name("optimality_cut")
    }
}

pub fn make_cut(instance: &Instance, dual: &SubproblemResult, origin: CutOrigin) -> OptimalityCut {
    let constant = instance
        .demands()
        .iter()
        .zip(&dual.mu)
        .map(|(d, mu)| d * mu)
        .sum();
    let slopes = instance
        .capacities()
        .iter()
        .zip(&dual.nu)
        .map(|(u, nu)| u * nu)
        .collect();
    OptimalityCut {
        constant,
        slopes,
        origin,
    }
}

/// Whether `eta` underestimates the subproblem value by more than the relative tolerance.
pub fn should_cut(subproblem_objective: f64, eta: f64, tolerance: f64) -> bool {
    subproblem_objective > eta + tolerance * subproblem_objective.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benders::SubproblemSolver;
    use approx::assert_abs_diff_eq;

    fn instance() -> Instance {
        Instance::from_rows(
            vec![5.0, 5.0, 5.0],
            vec![10.0, 10.0, 15.0],
            vec![1.0, 1.0, 1.0],
            vec![
                vec![1.0, 4.0, 6.0],
                vec![3.0, 1.0, 5.0],
                vec![6.0, 5.0, 2.0],
            ],
        )
        .unwrap()
    }

    fn openings() -> Vec<Vec<f64>> {
        (0..8u32)
            .map(|mask| (0..3).map(|j| f64::from((mask >> j) & 1)).collect())
            .collect()
    }

    #[test]
    fn test_signs() {
        let instance = instance();
        let mut subproblem = SubproblemSolver::new(&instance);
        let dual = subproblem.solve(&[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(dual, crate::Error::SubproblemInfeasible { .. }));

        let dual = subproblem.solve(&[1.0, 1.0, 0.0]).unwrap();
        let cut = make_cut(&instance, &dual, CutOrigin::IntegerFeasible);
        assert!(cut.constant >= 0.0);
        assert!(cut.slopes.iter().all(|s| *s <= 0.0));

        let row = cut.to_constraint(MasterLayout::new(3));
        assert_eq!(row.coefs[0], (3, 1.0));
        assert!(row.coefs[1..].iter().all(|&(j, a)| j < 3 && a > 0.0));
        assert_abs_diff_eq!(row.rhs, cut.constant);
    }

    #[test]
    fn test_tight_at_generating_opening() {
        let instance = instance();
        let mut subproblem = SubproblemSolver::new(&instance);
        for y in [vec![1.0, 1.0, 0.0], vec![0.0, 0.5, 1.0], vec![1.0, 1.0, 1.0]] {
            let dual = subproblem.solve(&y).unwrap();
            let cut = make_cut(&instance, &dual, CutOrigin::Fractional);
            assert_abs_diff_eq!(cut.bound_at(&y), dual.objective, epsilon = 1e-7);
            assert_abs_diff_eq!(cut.violation(&y, dual.objective), 0.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_valid_at_every_feasible_opening() {
        let instance = instance();
        let mut subproblem = SubproblemSolver::new(&instance);

        let mut cuts = Vec::new();
        for y in openings() {
            if let Ok(dual) = subproblem.solve(&y) {
                cuts.push(make_cut(&instance, &dual, CutOrigin::IntegerFeasible));
            }
        }
        assert!(!cuts.is_empty());

        for y in openings() {
            let Ok(dual) = subproblem.solve(&y) else {
                continue;
            };
            for cut in &cuts {
                assert!(
                    cut.bound_at(&y) <= dual.objective + 1e-7,
                    "cut {cut:?} overestimates Q({y:?}) = {}",
                    dual.objective
                );
            }
        }
    }

    #[test]
    fn test_trigger_tolerance() {
        assert!(should_cut(10.0, 9.0, 1e-6));
        assert!(!should_cut(10.0, 10.0, 1e-6));
        assert!(!should_cut(1e6, 1e6 - 0.5, 1e-6));
        assert!(should_cut(1e6, 1e6 - 2.0, 1e-6));
        assert!(!should_cut(1e-8, 0.0, 1e-6));
    }
}
