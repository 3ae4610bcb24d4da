//! Capacitated facility location instances.

pub mod dataset;
pub mod generator;

use std::ops::Range;

use ndarray::Array2;

use crate::error::{Error, Result};

pub use dataset::{format_dataset, parse_dataset, read_dataset, write_dataset};
pub use generator::{generate, generate_random_instance, GeneratorConfig};

/// Customers `0..n`, facilities `0..m`, and the data tying them together.
///
/// `shipment_costs[[i, j]]` is the unit cost of shipping from facility `j` to customer `i`.
/// Instances are validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    demands: Vec<f64>,
    capacities: Vec<f64>,
    fixed_costs: Vec<f64>,
    shipment_costs: Array2<f64>,
}

impl Instance {
    pub fn new(
        demands: Vec<f64>,
        capacities: Vec<f64>,
        fixed_costs: Vec<f64>,
        shipment_costs: Array2<f64>,
    ) -> Result<Self> {
        let (n, m) = shipment_costs.dim();
        if capacities.is_empty() {
            return Err(Error::InvalidInstance("instance has no facilities".into()));
        }
        if demands.len() != n || capacities.len() != m {
            return Err(Error::InvalidInstance(format!(
                "shipment cost matrix is {n}x{m} but there are {} customers and {} facilities",
                demands.len(),
                capacities.len()
            )));
        }
        if fixed_costs.len() != m {
            return Err(Error::InvalidInstance(format!(
                "{} fixed costs given for {m} facilities",
                fixed_costs.len()
            )));
        }

        check_values("demand of customer", &demands)?;
        check_values("capacity of facility", &capacities)?;
        check_values("fixed cost of facility", &fixed_costs)?;
        for ((i, j), &c) in shipment_costs.indexed_iter() {
            if !c.is_finite() || c < 0.0 {
                return Err(Error::InvalidInstance(format!(
                    "shipment cost from facility {j} to customer {i} is {c}"
                )));
            }
        }

        Ok(Self {
            demands,
            capacities,
            fixed_costs,
            shipment_costs,
        })
    }

    /// Builds an instance from customer-major cost rows (`rows[i][j]`).
    pub fn from_rows(
        demands: Vec<f64>,
        capacities: Vec<f64>,
        fixed_costs: Vec<f64>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n = rows.len();
        let m = capacities.len();
        if let Some(i) = rows.iter().position(|row| row.len() != m) {
            return Err(Error::InvalidInstance(format!(
                "cost row of customer {i} has {} entries, expected {m}",
                rows[i].len()
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let shipment_costs = Array2::from_shape_vec((n, m), flat)
            .map_err(|e| Error::InvalidInstance(e.to_string()))?;
        Self::new(demands, capacities, fixed_costs, shipment_costs)
    }

    pub fn num_customers(&self) -> usize {
        self.demands.len()
    }

    pub fn num_facilities(&self) -> usize {
        self.capacities.len()
    }

    pub fn customers(&self) -> Range<usize> {
        0..self.num_customers()
    }

    pub fn facilities(&self) -> Range<usize> {
        0..self.num_facilities()
    }

    pub fn demands(&self) -> &[f64] {
        &self.demands
    }

    pub fn capacities(&self) -> &[f64] {
        &self.capacities
    }

    pub fn fixed_costs(&self) -> &[f64] {
        &self.fixed_costs
    }

    pub fn shipment_costs(&self) -> &Array2<f64> {
        &self.shipment_costs
    }

    pub fn shipment_cost(&self, customer: usize, facility: usize) -> f64 {
        self.shipment_costs[[customer, facility]]
    }

    pub fn total_demand(&self) -> f64 {
        self.demands.iter().sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.capacities.iter().sum()
    }

    pub fn is_capacity_sufficient(&self) -> bool {
        self.total_capacity() >= self.total_demand()
    }

    /// Fails with [`Error::InfeasibleInstance`] if opening everything cannot cover demand.
    pub fn check_capacity(&self) -> Result<()> {
        if self.is_capacity_sufficient() {
            Ok(())
        } else {
            Err(Error::InfeasibleInstance {
                capacity: self.total_capacity(),
                demand: self.total_demand(),
            })
        }
    }
}

fn check_values(what: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(k) => Err(Error::InvalidInstance(format!("{what} {k} is {}", values[k]))),
        None => Ok(()),
    }
}
