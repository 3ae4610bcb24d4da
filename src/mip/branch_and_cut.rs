use std::time::Instant;

use log::{debug, info};

use super::{
    LazyConstraintHandler, MipModel, MipSettings, MipStatus, SearchDriver, SearchEvent,
    SearchOutcome,
};
use crate::error::{Error, Result};
use crate::lp::{LinearConstraint, LinearProgram, LpSolution, LpSolver, LpStatus, Simplex};

/// Depth-first branch-and-bound over LP relaxations with lazy constraint support.
///
/// Each node's relaxation is the model's rows, every constraint the handler has returned so
/// far, and the node's variable bounds. Integral relaxations are offered to the handler as
/// candidates before they may become the incumbent; fractional ones are offered as relaxation
/// events (if enabled) before branching on the most fractional integer variable.
pub struct BranchAndCut<S: LpSolver = Simplex> {
    settings: MipSettings,
    lp_solver: S,
}

impl BranchAndCut<Simplex> {
    pub fn new(settings: MipSettings) -> Self {
        let lp_solver = Simplex::new(settings.lp.clone());
        Self {
            settings,
            lp_solver,
        }
    }
}

impl Default for BranchAndCut<Simplex> {
    fn default() -> Self {
        Self::new(MipSettings::default())
    }
}

impl<S: LpSolver> BranchAndCut<S> {
    pub fn with_lp_solver(settings: MipSettings, lp_solver: S) -> Self {
        Self {
            settings,
            lp_solver,
        }
    }

    pub fn settings(&self) -> &MipSettings {
        &self.settings
    }
}

impl<S: LpSolver> SearchDriver for BranchAndCut<S> {
    fn optimize(
        &mut self,
        model: &MipModel,
        handler: &mut dyn LazyConstraintHandler,
    ) -> Result<SearchOutcome> {
        validate(model)?;

        let mut search = Search {
            model,
            settings: &self.settings,
            lp_solver: &self.lp_solver,
            lazy: Vec::new(),
            incumbent: None,
            nodes_explored: 0,
            start: Instant::now(),
        };
        let mut stack = vec![SearchNode::root(model)];

        let status = loop {
            if let Some(status) = search.check_termination(&stack) {
                break status;
            }
            let Some(node) = stack.pop() else {
                break search.exhausted_status();
            };
            if node.parent_bound >= search.cutoff() {
                continue;
            }

            match search.process(&node, handler)? {
                NodeResult::Pruned => {}
                NodeResult::Incumbent { values, objective } => {
                    search.update_incumbent(values, objective);
                }
                NodeResult::Branch { var, value, bound } => {
                    let (down, up) = node.branch(var, value, bound);
                    // Explore the up branch first.
                    stack.push(down);
                    stack.push(up);
                }
                NodeResult::Unbounded => break MipStatus::Unbounded,
                NodeResult::TimeLimit => {
                    // Unfinished, so its bound still counts.
                    stack.push(node);
                    break MipStatus::TimeLimit;
                }
            }
            search.log_progress(&stack);
        };

        let best_bound = match status {
            MipStatus::Optimal => open_bound(&stack).min(search.incumbent_objective()),
            MipStatus::Infeasible => f64::INFINITY,
            MipStatus::Unbounded => f64::NEG_INFINITY,
            _ => open_bound(&stack).min(search.incumbent_objective()),
        };
        let (values, objective) = match search.incumbent {
            Some(incumbent) => (incumbent.values, incumbent.objective),
            None => (Vec::new(), f64::INFINITY),
        };

        info!(
            "search finished with {:?}: objective {}, bound {}, {} nodes, {} lazy constraints",
            status,
            objective,
            best_bound,
            search.nodes_explored,
            search.lazy.len()
        );

        Ok(SearchOutcome {
            status,
            values,
            objective,
            best_bound,
            nodes_explored: search.nodes_explored,
            lazy_constraints: search.lazy.len(),
            elapsed: search.start.elapsed(),
        })
    }
}

fn validate(model: &MipModel) -> Result<()> {
    let n = model.num_vars();
    for (j, var) in model.variables.iter().enumerate() {
        if !var.lower.is_finite() || var.lower > var.upper {
            return Err(Error::Solver(format!(
                "variable {} has invalid bounds [{}, {}]",
                var.name, var.lower, var.upper
            )));
        }
        if var.integer && !var.upper.is_finite() {
            return Err(Error::Solver(format!(
                "integer variable {j} ({}) needs a finite upper bound",
                var.name
            )));
        }
    }
    for (r, row) in model.constraints.iter().enumerate() {
        if row.max_index().is_some_and(|j| j >= n) {
            return Err(Error::Solver(format!(
                "constraint {r} references a variable outside 0..{n}"
            )));
        }
    }
    Ok(())
}

fn open_bound(stack: &[SearchNode]) -> f64 {
    stack
        .iter()
        .map(|node| node.parent_bound)
        .fold(f64::INFINITY, f64::min)
}

#[derive(Debug, Clone)]
struct SearchNode {
    depth: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    parent_bound: f64,
}

impl SearchNode {
    fn root(model: &MipModel) -> Self {
        Self {
            depth: 0,
            lower: model.variables.iter().map(|v| v.lower).collect(),
            upper: model.variables.iter().map(|v| v.upper).collect(),
            parent_bound: f64::NEG_INFINITY,
        }
    }

    fn branch(&self, var: usize, value: f64, bound: f64) -> (SearchNode, SearchNode) {
        let mut down = self.clone();
        down.depth += 1;
        down.parent_bound = bound;
        down.upper[var] = value.floor();

        let mut up = self.clone();
        up.depth += 1;
        up.parent_bound = bound;
        up.lower[var] = value.ceil();

        (down, up)
    }
}

#[derive(Debug, Clone)]
struct Incumbent {
    values: Vec<f64>,
    objective: f64,
}

enum NodeResult {
    Pruned,
    Incumbent { values: Vec<f64>, objective: f64 },
    Branch { var: usize, value: f64, bound: f64 },
    Unbounded,
    TimeLimit,
}

struct Search<'a, S> {
    model: &'a MipModel,
    settings: &'a MipSettings,
    lp_solver: &'a S,
    /// Every constraint the handler returned; never shrinks.
    lazy: Vec<LinearConstraint>,
    incumbent: Option<Incumbent>,
    nodes_explored: u64,
    start: Instant,
}

impl<S: LpSolver> Search<'_, S> {
    fn incumbent_objective(&self) -> f64 {
        self.incumbent
            .as_ref()
            .map_or(f64::INFINITY, |incumbent| incumbent.objective)
    }

    fn cutoff(&self) -> f64 {
        self.settings.cutoff(self.incumbent_objective())
    }

    fn exhausted_status(&self) -> MipStatus {
        if self.incumbent.is_some() {
            MipStatus::Optimal
        } else {
            MipStatus::Infeasible
        }
    }

    fn check_termination(&self, stack: &[SearchNode]) -> Option<MipStatus> {
        if stack.is_empty() {
            return Some(self.exhausted_status());
        }
        // Every open node is dominated by the incumbent.
        if self.incumbent.is_some() && open_bound(stack) >= self.cutoff() {
            return Some(MipStatus::Optimal);
        }
        if self.out_of_time() {
            return Some(MipStatus::TimeLimit);
        }
        if self.nodes_explored >= self.settings.max_nodes {
            return Some(MipStatus::NodeLimit);
        }
        None
    }

    fn out_of_time(&self) -> bool {
        self.settings
            .time_limit
            .is_some_and(|limit| self.start.elapsed() >= limit)
    }

    fn relaxation(&self, node: &SearchNode) -> LinearProgram {
        let mut constraints = self.model.constraints.clone();
        constraints.extend(self.lazy.iter().cloned());
        LinearProgram {
            objective: self.model.variables.iter().map(|v| v.objective).collect(),
            constraints,
            lower: node.lower.clone(),
            upper: node.upper.clone(),
        }
    }

    /// Most fractional integer variable, if any.
    fn branching_candidate(&self, values: &[f64]) -> Option<(usize, f64)> {
        let tol = self.settings.int_feas_tol;
        let mut best: Option<(usize, f64, f64)> = None;
        for j in self.model.integer_vars() {
            let value = values[j];
            let frac = value - value.floor();
            let distance = frac.min(1.0 - frac);
            if distance > tol && best.map_or(true, |(_, _, d)| distance > d) {
                best = Some((j, value, distance));
            }
        }
        best.map(|(j, value, _)| (j, value))
    }

    /// Appends the handler's constraints and reports whether any of them cuts off `values`.
    fn inject(&mut self, requested: Vec<LinearConstraint>, values: &[f64]) -> bool {
        let tol = self.settings.feas_tol;
        let violated = requested.iter().any(|c| c.violation(values) > tol);
        self.lazy.extend(requested);
        violated
    }

    fn process(
        &mut self,
        node: &SearchNode,
        handler: &mut dyn LazyConstraintHandler,
    ) -> Result<NodeResult> {
        let node_count = self.nodes_explored;
        self.nodes_explored += 1;
        let mut rounds = 0;

        loop {
            // Handler rounds at one node can outlast the budget.
            if self.out_of_time() {
                return Ok(NodeResult::TimeLimit);
            }
            let relaxation: LpSolution = self.lp_solver.solve(&self.relaxation(node))?;
            match relaxation.status {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => {
                    if self.settings.relaxation_events {
                        let requested = handler.on_event(SearchEvent::RelaxationNode {
                            status: LpStatus::Infeasible,
                            values: &[],
                            objective: f64::INFINITY,
                            node: node_count,
                        })?;
                        self.lazy.extend(requested);
                    }
                    return Ok(NodeResult::Pruned);
                }
                LpStatus::Unbounded => return Ok(NodeResult::Unbounded),
                LpStatus::IterationLimit => {
                    return Err(Error::Solver(format!(
                        "LP iteration limit reached at node {node_count} (depth {})",
                        node.depth
                    )))
                }
            }

            if relaxation.objective >= self.cutoff() {
                return Ok(NodeResult::Pruned);
            }

            match self.branching_candidate(&relaxation.values) {
                None => {
                    let mut values = relaxation.values;
                    for j in self.model.integer_vars() {
                        values[j] = values[j].round();
                    }
                    let objective = self.model.objective_value(&values);
                    let requested = handler.on_event(SearchEvent::IntegerSolution {
                        values: &values,
                        objective,
                        node: node_count,
                    })?;
                    if self.inject(requested, &values) {
                        continue;
                    }
                    return Ok(NodeResult::Incumbent { values, objective });
                }
                Some((var, value)) => {
                    if self.settings.relaxation_events
                        && rounds < self.settings.max_relaxation_rounds
                    {
                        rounds += 1;
                        let requested = handler.on_event(SearchEvent::RelaxationNode {
                            status: LpStatus::Optimal,
                            values: &relaxation.values,
                            objective: relaxation.objective,
                            node: node_count,
                        })?;
                        if self.inject(requested, &relaxation.values) {
                            continue;
                        }
                    }
                    return Ok(NodeResult::Branch {
                        var,
                        value,
                        bound: relaxation.objective,
                    });
                }
            }
        }
    }

    fn update_incumbent(&mut self, values: Vec<f64>, objective: f64) {
        if objective < self.incumbent_objective() {
            debug!(
                "new incumbent {objective} at node {} ({:.2?} elapsed)",
                self.nodes_explored,
                self.start.elapsed()
            );
            self.incumbent = Some(Incumbent { values, objective });
        }
    }

    fn log_progress(&self, stack: &[SearchNode]) {
        if self.settings.log_freq == 0 || self.nodes_explored % self.settings.log_freq != 0 {
            return;
        }
        info!(
            "nodes: {} ({} open) | bound: {:.6} | incumbent: {:.6} | lazy: {} | time: {:.1?}",
            self.nodes_explored,
            stack.len(),
            open_bound(stack),
            self.incumbent_objective(),
            self.lazy.len(),
            self.start.elapsed()
        );
    }
}
