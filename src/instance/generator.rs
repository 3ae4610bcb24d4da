//! Seeded random instances.

use log::debug;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::Instance;
use crate::error::{Error, Result};

/// Ranges the generator draws from. Integer ranges are inclusive, real ranges half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub demand: (u32, u32),
    pub capacity: (u32, u32),
    pub fixed_cost: (f64, f64),
    pub shipment_cost: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 2024,
            demand: (1, 100),
            capacity: (500, 1000),
            fixed_cost: (2000.0, 5000.0),
            shipment_cost: (1.0, 10.0),
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        let int_ranges = [("demand", self.demand), ("capacity", self.capacity)];
        for (what, (lo, hi)) in int_ranges {
            if lo > hi {
                return Err(Error::InvalidInstance(format!(
                    "{what} range [{lo}, {hi}] is empty"
                )));
            }
        }
        let real_ranges = [
            ("fixed cost", self.fixed_cost),
            ("shipment cost", self.shipment_cost),
        ];
        for (what, (lo, hi)) in real_ranges {
            if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo < hi) {
                return Err(Error::InvalidInstance(format!(
                    "{what} range [{lo}, {hi}) is not a non-empty non-negative interval"
                )));
            }
        }
        Ok(())
    }
}

/// Generates an instance with the default ranges and seed.
pub fn generate_random_instance(num_customers: usize, num_facilities: usize) -> Result<Instance> {
    generate(num_customers, num_facilities, &GeneratorConfig::default())
}

/// Draws demands, then capacities, then fixed costs, then the customer-major cost matrix.
///
/// The same configuration always yields the same instance. Real values are rounded to cents.
pub fn generate(
    num_customers: usize,
    num_facilities: usize,
    config: &GeneratorConfig,
) -> Result<Instance> {
    config.validate()?;
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);

    let demands: Vec<f64> = (0..num_customers)
        .map(|_| f64::from(rng.gen_range(config.demand.0..=config.demand.1)))
        .collect();
    let capacities: Vec<f64> = (0..num_facilities)
        .map(|_| f64::from(rng.gen_range(config.capacity.0..=config.capacity.1)))
        .collect();
    let fixed_costs: Vec<f64> = (0..num_facilities)
        .map(|_| cents(rng.gen_range(config.fixed_cost.0..config.fixed_cost.1)))
        .collect();
    let shipment_costs = Array2::from_shape_simple_fn((num_customers, num_facilities), || {
        cents(rng.gen_range(config.shipment_cost.0..config.shipment_cost.1))
    });

    debug!(
        "generated instance: {} customers, {} facilities, seed {}",
        num_customers, num_facilities, config.seed
    );
    Instance::new(demands, capacities, fixed_costs, shipment_costs)
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducible() {
        let a = generate_random_instance(20, 5).unwrap();
        let b = generate_random_instance(20, 5).unwrap();
        assert_eq!(a, b);

        let c = generate(20, 5, &GeneratorConfig::default().with_seed(7)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_values_within_ranges() {
        let instance = generate_random_instance(50, 10).unwrap();
        assert_eq!(instance.num_customers(), 50);
        assert_eq!(instance.num_facilities(), 10);

        for &d in instance.demands() {
            assert!((1.0..=100.0).contains(&d));
            assert_eq!(d.fract(), 0.0);
        }
        for &c in instance.capacities() {
            assert!((500.0..=1000.0).contains(&c));
        }
        for &f in instance.fixed_costs() {
            assert!((2000.0..=5000.0).contains(&f));
            assert!(((f * 100.0).round() - f * 100.0).abs() < 1e-6);
        }
        for &c in instance.shipment_costs() {
            assert!((1.0..=10.0).contains(&c));
        }
    }

    #[test]
    fn test_rejects_empty_ranges() {
        let config = GeneratorConfig {
            demand: (10, 5),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            generate(3, 2, &config),
            Err(Error::InvalidInstance(_))
        ));

        let config = GeneratorConfig {
            shipment_cost: (3.0, 3.0),
            ..GeneratorConfig::default()
        };
        assert!(generate(3, 2, &config).is_err());
    }
}
