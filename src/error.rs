//! Error types shared by the instance loader, the LP/MIP engine and the decomposition.

use thiserror::Error;

/// Errors raised while loading, validating or solving a facility location instance.
///
/// None of these are retried: each one points at bad data or a modelling bug.
#[derive(Error, Debug)]
pub enum Error {
    /// Total capacity cannot cover total demand, so the master has no feasible opening.
    #[error("infeasible instance: total capacity {capacity} is below total demand {demand}")]
    InfeasibleInstance { capacity: f64, demand: f64 },

    /// Instance arrays have inconsistent shapes or contain invalid numbers.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// The transportation subproblem has no feasible shipment plan.
    #[error(
        "subproblem infeasible during {stage}: open capacity {open_capacity} cannot ship demand {demand}"
    )]
    SubproblemInfeasible {
        stage: &'static str,
        open_capacity: f64,
        demand: f64,
    },

    /// An opening vector handed to the subproblem is malformed.
    #[error("invalid opening decision: {0}")]
    InvalidOpening(String),

    /// The LP/MIP engine failed (iteration limit, unbounded root, malformed model, ...).
    #[error("solver error: {0}")]
    Solver(String),

    /// A dataset file could not be parsed.
    #[error("malformed dataset at token {token}: {reason}")]
    MalformedDataset { token: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = Error::InfeasibleInstance {
            capacity: 10.0,
            demand: 12.0,
        };
        assert_eq!(
            err.to_string(),
            "infeasible instance: total capacity 10 is below total demand 12"
        );

        let err = Error::MalformedDataset {
            token: 7,
            reason: "expected demand of customer 2".into(),
        };
        assert!(err.to_string().contains("token 7"));
        assert!(err.to_string().contains("customer 2"));
    }
}
