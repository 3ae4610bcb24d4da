//! Benders decomposition for the capacitated facility location problem.
//!
//! The master keeps one binary `y[j]` per facility and a single continuous `eta` estimating the
//! shipment cost. Every candidate the search proposes is priced by the transportation
//! [`subproblem`]; when `eta` underestimates that price an [`OptimalityCut`] built from the
//! subproblem duals is handed back to the search and stays for the rest of the run.
//!
//! ```
//! use cflp::benders::{solve, BendersSettings};
//! use cflp::Instance;
//!
//! let instance = Instance::from_rows(
//!     vec![4.0, 4.0, 4.0],
//!     vec![12.0, 12.0],
//!     vec![5.0, 5.0],
//!     vec![vec![1.0, 1.0]; 3],
//! )
//! .unwrap();
//! let solution = solve(&instance, &BendersSettings::default()).unwrap();
//! assert!((solution.objective - 17.0).abs() < 1e-6);
//! assert_eq!(solution.open_facilities().len(), 1);
//! ```

pub mod cut;
pub mod decomposition;
pub mod subproblem;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::instance::Instance;
use crate::lp::SimplexSettings;
use crate::mip::{BranchAndCut, MipSettings};
use crate::report::Solution;

pub use cut::{make_cut, should_cut, CutOrigin, OptimalityCut};
pub use decomposition::Decomposition;
pub use subproblem::{SubproblemResult, SubproblemSolver};

#[derive(Debug, Clone)]
pub struct BendersSettings {
    /// Relative slack before a subproblem value counts as underestimated by `eta`.
    pub cut_tolerance: f64,
    /// Separate cuts at fractional node relaxations as well as at integer candidates.
    pub relaxation_cuts: bool,
    /// Master search settings.
    pub mip: MipSettings,
    /// Subproblem LP settings.
    pub lp: SimplexSettings,
}

impl Default for BendersSettings {
    fn default() -> Self {
        Self {
            cut_tolerance: 1e-6,
            relaxation_cuts: true,
            mip: MipSettings::default(),
            lp: SimplexSettings::default(),
        }
    }
}

impl BendersSettings {
    pub fn with_cut_tolerance(mut self, tol: f64) -> Self {
        self.cut_tolerance = tol;
        self
    }

    pub fn with_relaxation_cuts(mut self, enabled: bool) -> Self {
        self.relaxation_cuts = enabled;
        self
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.mip = self.mip.with_time_limit(seconds);
        self
    }

    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.mip = self.mip.with_max_nodes(nodes);
        self
    }

    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.mip = self.mip.with_gap_tol(tol);
        self
    }
}

/// Position of the master variables: `y[j]` at `j`, `eta` right after the last facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterLayout {
    num_facilities: usize,
}

impl MasterLayout {
    pub fn new(num_facilities: usize) -> Self {
        Self { num_facilities }
    }

    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    pub fn y(&self, facility: usize) -> usize {
        facility
    }

    pub fn eta(&self) -> usize {
        self.num_facilities
    }

    pub fn num_vars(&self) -> usize {
        self.num_facilities + 1
    }

    pub fn opening<'v>(&self, values: &'v [f64]) -> &'v [f64] {
        &values[..self.num_facilities]
    }

    pub fn eta_value(&self, values: &[f64]) -> f64 {
        values[self.eta()]
    }
}

/// Solves `instance` with the built-in branch-and-cut engine.
pub fn solve(instance: &Instance, settings: &BendersSettings) -> Result<Solution> {
    let mip = settings
        .mip
        .clone()
        .with_relaxation_events(settings.relaxation_cuts);
    let mut driver = BranchAndCut::new(mip);
    let mut decomposition = Decomposition::new(instance, settings.clone());
    decomposition.run(&mut driver)
}

/// Re-solves the transportation problem at the final opening of `solution`.
///
/// The result carries the optimal shipments and their cost, which matches
/// `solution.eta` up to the cut tolerance.
pub fn shipment_plan(instance: &Instance, solution: &Solution) -> Result<SubproblemResult> {
    let mut subproblem = SubproblemSolver::new(instance);
    subproblem.solve(&solution.opening_values())
}
