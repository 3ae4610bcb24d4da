use log::trace;

use super::{ConstraintSense, LinearProgram, LpSolution, LpSolver, LpStatus};
use crate::error::{Error, Result};

const PIVOT_EPSILON: f64 = 1e-9;
const ZERO_EPSILON: f64 = 1e-12;

/// Configuration for [`Simplex`].
#[derive(Debug, Clone)]
pub struct SimplexSettings {
    /// Pivot budget across both phases.
    pub max_iterations: usize,
    /// A reduced cost below `-tolerance` makes a column eligible to enter.
    pub tolerance: f64,
    /// Largest phase-one residual (relative to the right-hand side scale) still accepted as
    /// feasible.
    pub feasibility_tolerance: f64,
    /// Consecutive degenerate pivots after which Bland's rule takes over.
    pub bland_after: usize,
}

impl Default for SimplexSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
            bland_after: 50,
        }
    }
}

/// Dense two-phase tableau simplex.
///
/// Solves
/// minimize c^T x
/// subject to a_i x (<=, >=, =) b_i
///            l <= x <= u
///
/// Lower bounds are shifted out, finite upper bounds become extra `<=` rows, and every row
/// gets an identity column (its slack, or an artificial for `>=` / `=` rows). Those identity
/// columns hold `B^-1` throughout, which is where the row duals are read from at the end.
///
/// # Examples
///
/// ```
/// use cflp::lp::{LinearConstraint, LinearProgram, LpSolver, LpStatus, Simplex};
///
/// // minimize x + 2y subject to x + y >= 1
/// let mut lp = LinearProgram::new(vec![1.0, 2.0]);
/// lp.add_constraint(LinearConstraint::greater_equal(vec![(0, 1.0), (1, 1.0)], 1.0));
///
/// let solution = Simplex::default().solve(&lp).unwrap();
/// assert_eq!(solution.status, LpStatus::Optimal);
/// assert!((solution.objective - 1.0).abs() < 1e-9);
/// assert!((solution.duals[0] - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    settings: SimplexSettings,
}

impl Simplex {
    pub fn new(settings: SimplexSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SimplexSettings {
        &self.settings
    }
}

impl LpSolver for Simplex {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution> {
        validate(lp)?;

        let n = lp.num_vars();
        let m = lp.constraints.len();
        let mut tableau = Tableau::build(lp);
        let mut iterations = 0;

        if tableau.has_artificials() {
            let phase_one: Vec<f64> = (0..tableau.width)
                .map(|j| if tableau.artificial[j] { 1.0 } else { 0.0 })
                .collect();
            tableau.price(&phase_one);
            match tableau.iterate(true, &self.settings, &mut iterations) {
                Outcome::Optimal => {}
                Outcome::IterationLimit => {
                    return Ok(LpSolution::with_status(LpStatus::IterationLimit, iterations))
                }
                // Phase one is bounded below by zero.
                Outcome::Unbounded => {
                    return Err(Error::Solver(
                        "simplex phase one reported an unbounded ray".into(),
                    ))
                }
            }

            let residual = -tableau.cost[tableau.width];
            let scale = tableau.rhs_scale().max(1.0);
            trace!("simplex phase one done after {iterations} pivots, residual {residual:e}");
            if residual > self.settings.feasibility_tolerance * scale {
                return Ok(LpSolution::with_status(LpStatus::Infeasible, iterations));
            }
            tableau.drive_out_artificials();
        }

        let mut phase_two = vec![0.0; tableau.width];
        phase_two[..n].copy_from_slice(&lp.objective);
        tableau.price(&phase_two);
        match tableau.iterate(false, &self.settings, &mut iterations) {
            Outcome::Optimal => {}
            Outcome::Unbounded => {
                return Ok(LpSolution::with_status(LpStatus::Unbounded, iterations))
            }
            Outcome::IterationLimit => {
                return Ok(LpSolution::with_status(LpStatus::IterationLimit, iterations))
            }
        }
        trace!("simplex phase two done after {iterations} pivots");

        let mut values = lp.lower.clone();
        for (r, &col) in tableau.basis.iter().enumerate() {
            if col < n {
                values[col] += tableau.rhs(r).max(0.0);
            }
        }

        let duals = (0..m)
            .map(|r| {
                let mut y = -tableau.cost[tableau.identity[r]];
                if tableau.flipped[r] {
                    y = -y;
                }
                if y.abs() < ZERO_EPSILON {
                    0.0
                } else {
                    y
                }
            })
            .collect();

        Ok(LpSolution {
            status: LpStatus::Optimal,
            objective: lp.objective_value(&values),
            values,
            duals,
            iterations,
        })
    }
}

fn validate(lp: &LinearProgram) -> Result<()> {
    let n = lp.num_vars();
    if lp.lower.len() != n || lp.upper.len() != n {
        return Err(Error::Solver(format!(
            "bound vectors have lengths {}/{} but the program has {} variables",
            lp.lower.len(),
            lp.upper.len(),
            n
        )));
    }
    for j in 0..n {
        if !lp.objective[j].is_finite() {
            return Err(Error::Solver(format!("objective coefficient {j} is not finite")));
        }
        if !lp.lower[j].is_finite() || lp.upper[j].is_nan() || lp.lower[j] > lp.upper[j] {
            return Err(Error::Solver(format!(
                "variable {j} has invalid bounds [{}, {}]",
                lp.lower[j], lp.upper[j]
            )));
        }
    }
    for (r, row) in lp.constraints.iter().enumerate() {
        if !row.rhs.is_finite() {
            return Err(Error::Solver(format!("row {r} has a non-finite right-hand side")));
        }
        for &(j, a) in &row.coefs {
            if j >= n || !a.is_finite() {
                return Err(Error::Solver(format!(
                    "row {r} has an invalid coefficient ({j}, {a})"
                )));
            }
        }
    }
    Ok(())
}

enum Outcome {
    Optimal,
    Unbounded,
    IterationLimit,
}

struct Tableau {
    /// Constraint rows; column `width` holds the right-hand side.
    rows: Vec<Vec<f64>>,
    /// Reduced costs; entry `width` holds minus the current objective.
    cost: Vec<f64>,
    basis: Vec<usize>,
    artificial: Vec<bool>,
    /// Identity column of every row, i.e. its slack or artificial.
    identity: Vec<usize>,
    /// Rows multiplied by -1 to make their right-hand side non-negative.
    flipped: Vec<bool>,
    width: usize,
}

impl Tableau {
    fn build(lp: &LinearProgram) -> Self {
        let n = lp.num_vars();

        let mut prepared: Vec<(Vec<f64>, ConstraintSense, f64)> = Vec::new();
        for row in &lp.constraints {
            let mut dense = vec![0.0; n];
            let mut rhs = row.rhs;
            for &(j, a) in &row.coefs {
                dense[j] += a;
                rhs -= a * lp.lower[j];
            }
            prepared.push((dense, row.sense, rhs));
        }
        for j in 0..n {
            if lp.upper[j].is_finite() {
                let mut dense = vec![0.0; n];
                dense[j] = 1.0;
                prepared.push((dense, ConstraintSense::LessEqual, lp.upper[j] - lp.lower[j]));
            }
        }

        let mut flipped = Vec::with_capacity(prepared.len());
        for (dense, sense, rhs) in prepared.iter_mut() {
            let flip = *rhs < 0.0;
            if flip {
                dense.iter_mut().for_each(|a| *a = -*a);
                *rhs = -*rhs;
                *sense = match *sense {
                    ConstraintSense::LessEqual => ConstraintSense::GreaterEqual,
                    ConstraintSense::GreaterEqual => ConstraintSense::LessEqual,
                    ConstraintSense::Equal => ConstraintSense::Equal,
                };
            }
            flipped.push(flip);
        }

        // Column layout: structural, then per row its slack/surplus and artificial.
        let mut width = n;
        let mut aux = Vec::with_capacity(prepared.len());
        for (_, sense, _) in &prepared {
            let (surplus, identity) = match sense {
                ConstraintSense::LessEqual => {
                    width += 1;
                    (None, width - 1)
                }
                ConstraintSense::GreaterEqual => {
                    width += 2;
                    (Some(width - 2), width - 1)
                }
                ConstraintSense::Equal => {
                    width += 1;
                    (None, width - 1)
                }
            };
            aux.push((surplus, identity));
        }

        let mut artificial = vec![false; width];
        let mut rows = Vec::with_capacity(prepared.len());
        let mut identity = Vec::with_capacity(prepared.len());
        for ((dense, sense, rhs), &(surplus, id)) in prepared.into_iter().zip(&aux) {
            let mut row = vec![0.0; width + 1];
            row[..n].copy_from_slice(&dense);
            if let Some(s) = surplus {
                row[s] = -1.0;
            }
            row[id] = 1.0;
            row[width] = rhs;
            if sense != ConstraintSense::LessEqual {
                artificial[id] = true;
            }
            rows.push(row);
            identity.push(id);
        }

        Self {
            rows,
            cost: vec![0.0; width + 1],
            basis: identity.clone(),
            artificial,
            identity,
            flipped,
            width,
        }
    }

    fn has_artificials(&self) -> bool {
        self.artificial.iter().any(|&a| a)
    }

    fn rhs(&self, r: usize) -> f64 {
        self.rows[r][self.width]
    }

    fn rhs_scale(&self) -> f64 {
        self.rows.iter().map(|row| row[self.width].abs()).fold(0.0, f64::max)
    }

    /// Recomputes the reduced cost row for cost vector `c` against the current basis.
    fn price(&mut self, c: &[f64]) {
        let width = self.width;
        self.cost = c.to_vec();
        self.cost.push(0.0);
        for (r, row) in self.rows.iter().enumerate() {
            let cb = c[self.basis[r]];
            if cb != 0.0 {
                for j in 0..=width {
                    self.cost[j] -= cb * row[j];
                }
            }
        }
    }

    fn iterate(
        &mut self,
        allow_artificial: bool,
        settings: &SimplexSettings,
        iterations: &mut usize,
    ) -> Outcome {
        let mut degenerate_streak = 0;
        loop {
            let bland = degenerate_streak >= settings.bland_after;
            let Some(entering) = self.entering(allow_artificial, bland, settings.tolerance) else {
                return Outcome::Optimal;
            };
            let Some(leaving) = self.leaving(entering, bland) else {
                return Outcome::Unbounded;
            };
            if *iterations >= settings.max_iterations {
                return Outcome::IterationLimit;
            }

            let step = self.rhs(leaving) / self.rows[leaving][entering];
            if step.abs() <= ZERO_EPSILON {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            self.pivot(leaving, entering);
            *iterations += 1;
        }
    }

    fn entering(&self, allow_artificial: bool, bland: bool, tol: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for j in 0..self.width {
            if !allow_artificial && self.artificial[j] {
                continue;
            }
            let d = self.cost[j];
            if d < -tol {
                if bland {
                    return Some(j);
                }
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((j, d));
                }
            }
        }
        best.map(|(j, _)| j)
    }

    fn leaving(&self, entering: usize, bland: bool) -> Option<usize> {
        let mut best: Option<(usize, f64, f64)> = None;
        for (r, row) in self.rows.iter().enumerate() {
            let a = row[entering];
            if a <= PIVOT_EPSILON {
                continue;
            }
            let ratio = row[self.width].max(0.0) / a;
            best = match best {
                None => Some((r, ratio, a)),
                Some((br, bratio, ba)) => {
                    let tie = (ratio - bratio).abs() <= ZERO_EPSILON * (1.0 + bratio.abs());
                    let better = if tie {
                        if bland {
                            self.basis[r] < self.basis[br]
                        } else {
                            a > ba
                        }
                    } else {
                        ratio < bratio
                    };
                    if better {
                        Some((r, ratio, a))
                    } else {
                        Some((br, bratio, ba))
                    }
                }
            };
        }
        best.map(|(r, _, _)| r)
    }

    fn pivot(&mut self, leaving: usize, entering: usize) {
        let width = self.width;
        let scale = 1.0 / self.rows[leaving][entering];
        for v in self.rows[leaving].iter_mut() {
            *v *= scale;
            if v.abs() < ZERO_EPSILON {
                *v = 0.0;
            }
        }
        self.rows[leaving][entering] = 1.0;

        let pivot_row = self.rows[leaving].clone();
        for (r, row) in self.rows.iter_mut().enumerate() {
            if r == leaving {
                continue;
            }
            let factor = row[entering];
            if factor != 0.0 {
                for j in 0..=width {
                    row[j] -= factor * pivot_row[j];
                    if row[j].abs() < ZERO_EPSILON {
                        row[j] = 0.0;
                    }
                }
                row[entering] = 0.0;
            }
        }

        let factor = self.cost[entering];
        if factor != 0.0 {
            for j in 0..=width {
                self.cost[j] -= factor * pivot_row[j];
            }
            self.cost[entering] = 0.0;
        }

        self.basis[leaving] = entering;
    }

    /// Pivots basic artificials (all at level zero after a feasible phase one) out of the
    /// basis. Rows with no usable column are redundant and keep their artificial at zero.
    fn drive_out_artificials(&mut self) {
        for r in 0..self.rows.len() {
            if !self.artificial[self.basis[r]] {
                continue;
            }
            let candidate = (0..self.width)
                .filter(|&j| !self.artificial[j])
                .map(|j| (j, self.rows[r][j].abs()))
                .filter(|&(_, a)| a > PIVOT_EPSILON)
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((j, _)) = candidate {
                self.pivot(r, j);
            }
        }
    }
}
