//! The master problem and the lazy cut loop.

use log::{debug, info};

use super::cut::{make_cut, should_cut, CutOrigin, OptimalityCut};
use super::subproblem::SubproblemSolver;
use super::{BendersSettings, MasterLayout};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::lp::{LinearConstraint, LpStatus, Simplex};
use crate::mip::{LazyConstraintHandler, MipModel, MipStatus, SearchDriver, SearchEvent, Variable};
use crate::report::Solution;

/// Owns the cut state for one solve and answers the driver's events with optimality cuts.
pub struct Decomposition<'a> {
    instance: &'a Instance,
    settings: BendersSettings,
    layout: MasterLayout,
    subproblem: SubproblemSolver<'a>,
    cuts: Vec<OptimalityCut>,
    num_cuts_integer_feasible: usize,
    num_cuts_fractional: usize,
    root_done: bool,
}

impl<'a> Decomposition<'a> {
    pub fn new(instance: &'a Instance, settings: BendersSettings) -> Self {
        let subproblem =
            SubproblemSolver::with_lp_solver(instance, Simplex::new(settings.lp.clone()));
        Self {
            instance,
            layout: MasterLayout::new(instance.num_facilities()),
            settings,
            subproblem,
            cuts: Vec::new(),
            num_cuts_integer_feasible: 0,
            num_cuts_fractional: 0,
            root_done: false,
        }
    }

    pub fn layout(&self) -> MasterLayout {
        self.layout
    }

    /// Every cut handed to the driver so far, in order.
    pub fn cuts(&self) -> &[OptimalityCut] {
        &self.cuts
    }

    pub fn num_cuts_integer_feasible(&self) -> usize {
        self.num_cuts_integer_feasible
    }

    pub fn num_cuts_fractional(&self) -> usize {
        self.num_cuts_fractional
    }

    /// Binary `y[j]` with the fixed costs, `eta >= 0`, and total open capacity covering demand.
    pub fn master_model(&self) -> MipModel {
        let mut model = MipModel::new("cflp_master");
        for (j, &f) in self.instance.fixed_costs().iter().enumerate() {
            model.add_variable(Variable::binary(f, format!("y_{j}")));
        }
        model.add_variable(Variable::continuous(0.0, f64::INFINITY, 1.0, "eta"));

        let coefs = self
            .instance
            .capacities()
            .iter()
            .enumerate()
            .map(|(j, &u)| (self.layout.y(j), u))
            .collect();
        model.add_constraint(
            LinearConstraint::greater_equal(coefs, self.instance.total_demand())
                .with_name("total_capacity"),
        );
        model
    }

    /// Runs the master search on `driver`, separating cuts on every event it raises.
    pub fn run<D: SearchDriver + ?Sized>(&mut self, driver: &mut D) -> Result<Solution> {
        self.instance.check_capacity()?;
        let model = self.master_model();
        info!(
            "solving master: {} facilities, {} customers, total demand {}",
            self.instance.num_facilities(),
            self.instance.num_customers(),
            self.instance.total_demand()
        );

        let outcome = driver.optimize(&model, self)?;
        self.complete_root();
        match outcome.status {
            MipStatus::Infeasible => {
                return Err(Error::Solver("master problem is infeasible".into()))
            }
            MipStatus::Unbounded => {
                return Err(Error::Solver("master problem is unbounded".into()))
            }
            _ => {}
        }
        if !outcome.has_incumbent() {
            return Err(Error::Solver(format!(
                "search stopped ({:?}) before finding an opening",
                outcome.status
            )));
        }

        let solution = Solution::from_outcome(
            &outcome,
            self.layout,
            self.num_cuts_integer_feasible,
            self.num_cuts_fractional,
        );
        info!(
            "benders finished: objective {:.6}, {} facilities open, {} cuts ({} integer-feasible, {} fractional)",
            solution.objective,
            solution.open_facilities().len(),
            solution.num_cuts(),
            self.num_cuts_integer_feasible,
            self.num_cuts_fractional
        );
        Ok(solution)
    }

    /// Prices the opening in `values` and returns a cut if `eta` is too low.
    fn separate(
        &mut self,
        values: &[f64],
        origin: CutOrigin,
        stage: &'static str,
    ) -> Result<Option<OptimalityCut>> {
        if values.len() != self.layout.num_vars() {
            return Err(Error::Solver(format!(
                "{stage} has {} values, master has {} variables",
                values.len(),
                self.layout.num_vars()
            )));
        }
        let opening = self.layout.opening(values);
        let eta = self.layout.eta_value(values);

        let dual = self.subproblem.solve(opening).map_err(|e| match e {
            Error::SubproblemInfeasible {
                open_capacity,
                demand,
                ..
            } => Error::SubproblemInfeasible {
                stage,
                open_capacity,
                demand,
            },
            other => other,
        })?;
        if !should_cut(dual.objective, eta, self.settings.cut_tolerance) {
            return Ok(None);
        }

        let cut = make_cut(self.instance, &dual, origin);
        debug!(
            "{:?} cut: subproblem {:.6} > eta {:.6}, cut bound at candidate {:.6}",
            origin,
            dual.objective,
            eta,
            cut.bound_at(opening)
        );
        Ok(Some(cut))
    }

    fn complete_root(&mut self) {
        if self.root_done {
            return;
        }
        self.root_done = true;
        info!(
            "completed the root node: {} cuts so far",
            self.num_cuts_integer_feasible + self.num_cuts_fractional
        );
    }

    fn record(&mut self, cut: OptimalityCut) -> LinearConstraint {
        match cut.origin {
            CutOrigin::IntegerFeasible => self.num_cuts_integer_feasible += 1,
            CutOrigin::Fractional => self.num_cuts_fractional += 1,
        }
        let row = cut.to_constraint(self.layout);
        self.cuts.push(cut);
        row
    }
}

impl LazyConstraintHandler for Decomposition<'_> {
    fn on_event(&mut self, event: SearchEvent<'_>) -> Result<Vec<LinearConstraint>> {
        if event.node() >= 1 {
            self.complete_root();
        }

        let cut = match event {
            SearchEvent::IntegerSolution { values, .. } => {
                self.separate(values, CutOrigin::IntegerFeasible, "integer candidate")?
            }
            SearchEvent::RelaxationNode { status, values, .. } => {
                if !self.settings.relaxation_cuts || status != LpStatus::Optimal {
                    return Ok(Vec::new());
                }
                self.separate(values, CutOrigin::Fractional, "relaxation node")?
            }
        };
        Ok(cut.map(|cut| vec![self.record(cut)]).unwrap_or_default())
    }
}
