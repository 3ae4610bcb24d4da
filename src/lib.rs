//! Capacitated facility location solved by Benders decomposition.
//!
//! [`benders`] holds the decomposition itself. It drives the branch-and-cut engine in [`mip`],
//! prices openings with the simplex in [`lp`], and reads problems built by [`instance`].

pub mod benders;
pub mod error;
pub mod instance;
pub mod lp;
pub mod mip;
pub mod report;

pub use benders::{shipment_plan, solve, BendersSettings, Decomposition};
pub use error::{Error, Result};
pub use instance::Instance;
pub use report::Solution;
