//! The transportation subproblem priced at a fixed opening.
//!
//! ```text
//! min  sum_ij c[i][j] x[i][j]
//! s.t. sum_j x[i][j] >= d[i]            (mu[i] >= 0)
//!      sum_i x[i][j] <= u[j] y[j]       (nu[j] <= 0)
//!      x >= 0
//! ```

use log::debug;
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::lp::{LinearConstraint, LinearProgram, LpSolver, LpStatus, Simplex};

/// Openings may stray this far outside `[0, 1]` before they are rejected.
const OPENING_TOL: f64 = 1e-6;
/// Dual prices with the wrong sign beyond this are a solver failure, not noise.
const DUAL_SIGN_TOL: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct SubproblemResult {
    pub objective: f64,
    /// Demand row prices, one per customer.
    pub mu: Vec<f64>,
    /// Capacity row prices, one per facility.
    pub nu: Vec<f64>,
    /// Optimal plan, `shipments[[i, j]]` from facility `j` to customer `i`.
    pub shipments: Array2<f64>,
}

impl SubproblemResult {
    /// Units leaving facility `j`.
    pub fn outflow(&self, facility: usize) -> f64 {
        self.shipments.column(facility).sum()
    }

    /// Units reaching customer `i`.
    pub fn inflow(&self, customer: usize) -> f64 {
        self.shipments.row(customer).sum()
    }
}

/// Prices openings for one instance.
///
/// The LP is assembled once; each solve only rewrites the capacity right-hand sides.
pub struct SubproblemSolver<'a, S: LpSolver = Simplex> {
    instance: &'a Instance,
    program: LinearProgram,
    lp_solver: S,
    solves: usize,
}

impl<'a> SubproblemSolver<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self::with_lp_solver(instance, Simplex::default())
    }
}

impl<'a, S: LpSolver> SubproblemSolver<'a, S> {
    pub fn with_lp_solver(instance: &'a Instance, lp_solver: S) -> Self {
        Self {
            instance,
            program: transportation_program(instance),
            lp_solver,
            solves: 0,
        }
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    /// Number of LPs solved so far.
    pub fn num_solves(&self) -> usize {
        self.solves
    }

    /// Solves the transportation LP with capacities scaled by `opening`.
    ///
    /// `opening` may be fractional. Fails with [`Error::SubproblemInfeasible`] when the scaled
    /// capacity cannot ship the demand.
    pub fn solve(&mut self, opening: &[f64]) -> Result<SubproblemResult> {
        let instance = self.instance;
        let n = instance.num_customers();
        let m = instance.num_facilities();
        validate_opening(opening, m)?;

        let mut open_capacity = 0.0;
        for (j, &y) in opening.iter().enumerate() {
            let rhs = instance.capacities()[j] * y.clamp(0.0, 1.0);
            self.program.constraints[n + j].rhs = rhs;
            open_capacity += rhs;
        }

        let solution = self.lp_solver.solve(&self.program)?;
        self.solves += 1;
        match solution.status {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => {
                return Err(Error::SubproblemInfeasible {
                    stage: "subproblem solve",
                    open_capacity,
                    demand: instance.total_demand(),
                })
            }
            status => {
                return Err(Error::Solver(format!(
                    "transportation LP finished with {status:?}"
                )))
            }
        }

        let mu = signed_duals(&solution.duals[..n], 1.0, "demand")?;
        let nu = signed_duals(&solution.duals[n..n + m], -1.0, "capacity")?;
        let shipments = Array2::from_shape_vec((n, m), solution.values)
            .map_err(|e| Error::Solver(e.to_string()))?;

        debug!(
            "subproblem #{}: cost {:.6}, open capacity {}",
            self.solves, solution.objective, open_capacity
        );
        Ok(SubproblemResult {
            objective: solution.objective,
            mu,
            nu,
            shipments,
        })
    }
}

/// `x[i][j]` lives at `i * m + j`; rows are the `n` demand rows then the `m` capacity rows.
fn transportation_program(instance: &Instance) -> LinearProgram {
    let n = instance.num_customers();
    let m = instance.num_facilities();
    let objective = instance.shipment_costs().iter().copied().collect();
    let mut lp = LinearProgram::new(objective);

    for (i, &d) in instance.demands().iter().enumerate() {
        let coefs = (0..m).map(|j| (i * m + j, 1.0)).collect();
        lp.add_constraint(LinearConstraint::greater_equal(coefs, d).with_name(format!("demand_{i}")));
    }
    for (j, &u) in instance.capacities().iter().enumerate() {
        let coefs = (0..n).map(|i| (i * m + j, 1.0)).collect();
        lp.add_constraint(LinearConstraint::less_equal(coefs, u).with_name(format!("capacity_{j}")));
    }
    lp
}

fn validate_opening(opening: &[f64], m: usize) -> Result<()> {
    if opening.len() != m {
        return Err(Error::InvalidOpening(format!(
            "expected {m} entries, got {}",
            opening.len()
        )));
    }
    for (j, &y) in opening.iter().enumerate() {
        if !(y.is_finite() && (-OPENING_TOL..=1.0 + OPENING_TOL).contains(&y)) {
            return Err(Error::InvalidOpening(format!(
                "facility {j} has opening {y}, outside [0, 1]"
            )));
        }
    }
    Ok(())
}

/// Checks every price has the sign of `sign` and clears tiny noise of the other sign.
fn signed_duals(duals: &[f64], sign: f64, rows: &str) -> Result<Vec<f64>> {
    duals
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            if p * sign < -DUAL_SIGN_TOL {
                Err(Error::Solver(format!(
                    "{rows} row {k} has dual price {p} with the wrong sign"
                )))
            } else if p * sign < 0.0 {
                Ok(0.0)
            } else {
                Ok(p)
            }
        })
        .collect()
}
