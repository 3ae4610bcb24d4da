//! Final solution extraction and console rendering.

use std::fmt;
use std::time::Duration;

use crate::benders::MasterLayout;
use crate::mip::{MipStatus, SearchOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: MipStatus,
    /// Fixed plus shipment cost of the incumbent.
    pub objective: f64,
    pub best_bound: f64,
    /// `opening[j]` is true when facility `j` is open.
    pub opening: Vec<bool>,
    /// Shipment cost estimate at the incumbent.
    pub eta: f64,
    pub solve_time: Duration,
    pub num_cuts_integer_feasible: usize,
    pub num_cuts_fractional: usize,
    pub nodes_explored: u64,
}

impl Solution {
    /// Reads the incumbent of a finished master search. Openings are rounded at 0.5.
    pub fn from_outcome(
        outcome: &SearchOutcome,
        layout: MasterLayout,
        num_cuts_integer_feasible: usize,
        num_cuts_fractional: usize,
    ) -> Self {
        let (opening, eta) = if outcome.has_incumbent() {
            (
                layout.opening(&outcome.values).iter().map(|&y| y > 0.5).collect(),
                layout.eta_value(&outcome.values),
            )
        } else {
            (vec![false; layout.num_facilities()], f64::NAN)
        };
        Self {
            status: outcome.status,
            objective: outcome.objective,
            best_bound: outcome.best_bound,
            opening,
            eta,
            solve_time: outcome.elapsed,
            num_cuts_integer_feasible,
            num_cuts_fractional,
            nodes_explored: outcome.nodes_explored,
        }
    }

    pub fn open_facilities(&self) -> Vec<usize> {
        self.opening
            .iter()
            .enumerate()
            .filter(|(_, open)| **open)
            .map(|(j, _)| j)
            .collect()
    }

    /// The opening as 0/1 values, ready for the subproblem.
    pub fn opening_values(&self) -> Vec<f64> {
        self.opening
            .iter()
            .map(|&open| if open { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn num_cuts(&self) -> usize {
        self.num_cuts_integer_feasible + self.num_cuts_fractional
    }

    /// Relative distance between incumbent and bound.
    pub fn gap(&self) -> f64 {
        if self.status == MipStatus::Optimal {
            return 0.0;
        }
        (self.objective - self.best_bound).max(0.0) / self.objective.abs().max(1e-10)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status:             {:?}", self.status)?;
        writeln!(f, "Objective value:    {:.4}", self.objective)?;
        if self.status != MipStatus::Optimal {
            writeln!(
                f,
                "Best bound:         {:.4} (gap {:.4}%)",
                self.best_bound,
                100.0 * self.gap()
            )?;
        }
        writeln!(
            f,
            "Facility locations: {:?} ({} of {} open)",
            self.open_facilities(),
            self.open_facilities().len(),
            self.opening.len()
        )?;
        writeln!(f, "Solution time:      {:.3?}", self.solve_time)?;
        writeln!(
            f,
            "Number of cuts:     {} ({} integer-feasible, {} fractional)",
            self.num_cuts(),
            self.num_cuts_integer_feasible,
            self.num_cuts_fractional
        )?;
        write!(f, "Nodes explored:     {}", self.nodes_explored)
    }
}
