//! Configuration for the branch-and-cut driver.

use std::time::Duration;

use crate::lp::SimplexSettings;

#[derive(Debug, Clone)]
pub struct MipSettings {
    /// Maximum number of nodes to explore.
    pub max_nodes: u64,
    /// Wall-clock budget for the whole search (None = unlimited).
    pub time_limit: Option<Duration>,
    /// Relative optimality gap: stop once (incumbent - bound) / |incumbent| <= gap_tol.
    pub gap_tol: f64,
    /// Absolute optimality gap.
    pub gap_abs_tol: f64,
    /// A variable is integral if |x - round(x)| <= int_feas_tol.
    pub int_feas_tol: f64,
    /// A lazy constraint rejects a candidate only if violated by more than this.
    pub feas_tol: f64,
    /// Raise `RelaxationNode` events at fractional (and infeasible) node relaxations.
    pub relaxation_events: bool,
    /// Cap on handler rounds per node at fractional relaxations.
    pub max_relaxation_rounds: usize,
    /// Log progress every N nodes.
    pub log_freq: u64,
    /// Settings for the node relaxations.
    pub lp: SimplexSettings,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            max_nodes: 1_000_000,
            time_limit: None,
            gap_tol: 1e-4,
            gap_abs_tol: 1e-6,
            int_feas_tol: 1e-6,
            feas_tol: 1e-6,
            relaxation_events: true,
            max_relaxation_rounds: 25,
            log_freq: 100,
            lp: SimplexSettings::default(),
        }
    }
}

impl MipSettings {
    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(Duration::from_secs_f64(seconds));
        self
    }

    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.gap_tol = tol;
        self
    }

    pub fn with_relaxation_events(mut self, enabled: bool) -> Self {
        self.relaxation_events = enabled;
        self
    }

    /// Objective value a node must beat to survive, given the incumbent objective.
    pub fn cutoff(&self, incumbent: f64) -> f64 {
        if incumbent.is_finite() {
            incumbent - self.gap_abs_tol.max(self.gap_tol * incumbent.abs())
        } else {
            incumbent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let settings = MipSettings::default()
            .with_time_limit(1.5)
            .with_max_nodes(10)
            .with_gap_tol(0.01)
            .with_relaxation_events(false);

        assert_eq!(settings.time_limit, Some(Duration::from_millis(1500)));
        assert_eq!(settings.max_nodes, 10);
        assert!(!settings.relaxation_events);
        assert!((settings.cutoff(100.0) - 99.0).abs() < 1e-12);
        assert_eq!(settings.cutoff(f64::INFINITY), f64::INFINITY);
    }
}
