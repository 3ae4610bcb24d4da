use std::error::Error as StdError;

use approx::{assert_abs_diff_eq, assert_relative_eq};

use super::*;
use crate::instance::{generate, GeneratorConfig};
use crate::mip::MipStatus;
use crate::Error;

type TestResult = std::result::Result<(), Box<dyn StdError>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unit_costs(capacities: Vec<f64>) -> Instance {
    Instance::from_rows(
        vec![4.0, 4.0, 4.0],
        capacities,
        vec![5.0, 5.0],
        vec![vec![1.0, 1.0]; 3],
    )
    .unwrap()
}

fn exact_settings() -> BendersSettings {
    BendersSettings::default().with_gap_tol(1e-9)
}

/// Cheapest total cost over every opening with enough capacity.
fn enumerate_openings(instance: &Instance) -> f64 {
    let m = instance.num_facilities();
    let mut subproblem = SubproblemSolver::new(instance);
    let mut best = f64::INFINITY;
    for mask in 0..(1u32 << m) {
        let y: Vec<f64> = (0..m).map(|j| f64::from((mask >> j) & 1)).collect();
        let capacity: f64 = instance.capacities().iter().zip(&y).map(|(u, y)| u * y).sum();
        if capacity < instance.total_demand() {
            continue;
        }
        let fixed: f64 = instance.fixed_costs().iter().zip(&y).map(|(f, y)| f * y).sum();
        let shipping = subproblem.solve(&y).unwrap().objective;
        best = best.min(fixed + shipping);
    }
    best
}

#[test]
fn test_two_facilities_both_needed() -> TestResult {
    init_logging();
    // Neither facility can hold the 12 units alone.
    let instance = unit_costs(vec![10.0, 10.0]);
    let solution = solve(&instance, &BendersSettings::default())?;

    assert_eq!(solution.status, MipStatus::Optimal);
    assert_abs_diff_eq!(solution.objective, 22.0, epsilon = 1e-4);
    assert_eq!(solution.open_facilities(), vec![0, 1]);
    assert_abs_diff_eq!(solution.eta, 12.0, epsilon = 1e-4);
    Ok(())
}

#[test]
fn test_single_facility_suffices() -> TestResult {
    let instance = unit_costs(vec![12.0, 12.0]);
    let solution = solve(&instance, &BendersSettings::default())?;

    assert_eq!(solution.status, MipStatus::Optimal);
    assert_abs_diff_eq!(solution.objective, 17.0, epsilon = 1e-4);
    assert_eq!(solution.open_facilities().len(), 1);
    assert!(solution.num_cuts_integer_feasible + solution.num_cuts_fractional >= 1);
    Ok(())
}

#[test]
fn test_large_customer_forces_two_openings() -> TestResult {
    let instance = Instance::from_rows(
        vec![15.0, 1.0],
        vec![10.0, 10.0, 10.0],
        vec![1.0, 1.0, 1.0],
        vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]],
    )?;
    let solution = solve(&instance, &BendersSettings::default())?;

    assert!(solution.open_facilities().len() >= 2);
    // Facilities 0 and 1: 10 units at 1, 6 units at 2, plus two fixed costs.
    assert_abs_diff_eq!(solution.objective, 2.0 + 10.0 + 12.0, epsilon = 1e-4);
    assert_eq!(solution.open_facilities(), vec![0, 1]);
    Ok(())
}

#[test]
fn test_matches_enumeration_on_random_instances() -> TestResult {
    init_logging();
    for seed in [2024, 7, 99] {
        let instance = generate(12, 4, &GeneratorConfig::default().with_seed(seed))?;
        let expected = enumerate_openings(&instance);

        let with_fractional = solve(&instance, &exact_settings())?;
        let integer_only = solve(&instance, &exact_settings().with_relaxation_cuts(false))?;

        assert_relative_eq!(with_fractional.objective, expected, max_relative = 1e-5);
        assert_relative_eq!(integer_only.objective, expected, max_relative = 1e-5);
        assert_eq!(integer_only.num_cuts_fractional, 0);
    }
    Ok(())
}

#[test]
fn test_final_point_satisfies_every_cut() -> TestResult {
    init_logging();
    let instance = generate(15, 5, &GeneratorConfig::default().with_seed(11))?;
    let mut decomposition = Decomposition::new(&instance, exact_settings());
    let mut driver = BranchAndCut::new(exact_settings().mip);
    let solution = decomposition.run(&mut driver)?;

    assert!(!decomposition.cuts().is_empty());
    assert_eq!(
        decomposition.cuts().len(),
        solution.num_cuts_integer_feasible + solution.num_cuts_fractional
    );
    let y = solution.opening_values();
    let tol = 1e-5 * solution.eta.abs().max(1.0);
    for cut in decomposition.cuts() {
        assert!(cut.violation(&y, solution.eta) <= tol, "{cut:?}");
    }

    // eta prices the chosen opening.
    let plan = shipment_plan(&instance, &solution)?;
    assert_relative_eq!(plan.objective, solution.eta, max_relative = 1e-5);
    Ok(())
}

#[test]
fn test_repeated_solves_agree() -> TestResult {
    let instance = generate(20, 6, &GeneratorConfig::default())?;
    let first = solve(&instance, &BendersSettings::default())?;
    let second = solve(&instance, &BendersSettings::default())?;

    assert_eq!(first.objective, second.objective);
    assert_eq!(first.opening, second.opening);
    assert_eq!(first.num_cuts(), second.num_cuts());
    Ok(())
}

#[test]
fn test_shipment_plan_meets_demand() -> TestResult {
    let instance = generate(10, 3, &GeneratorConfig::default().with_seed(5))?;
    let solution = solve(&instance, &BendersSettings::default())?;
    let plan = shipment_plan(&instance, &solution)?;

    for i in instance.customers() {
        assert!(plan.inflow(i) >= instance.demands()[i] - 1e-6);
    }
    for j in instance.facilities() {
        let limit = if solution.opening[j] { instance.capacities()[j] } else { 0.0 };
        assert!(plan.outflow(j) <= limit + 1e-6);
    }
    let fixed: f64 = solution
        .open_facilities()
        .iter()
        .map(|&j| instance.fixed_costs()[j])
        .sum();
    assert_relative_eq!(fixed + plan.objective, solution.objective, max_relative = 1e-5);
    Ok(())
}

#[test]
fn test_node_limit_reports_incumbent() -> TestResult {
    init_logging();
    let instance = generate(24, 8, &GeneratorConfig::default())?;
    // Integer cuts only keep the root bound weak, so the full search needs many nodes.
    let settings = exact_settings().with_relaxation_cuts(false);
    let full = solve(&instance, &settings)?;
    // A depth-first dive fixes one facility per level, so 9 nodes reach a leaf.
    let limit = instance.num_facilities() as u64 + 1;
    assert!(full.nodes_explored > limit);

    let limited = solve(&instance, &settings.with_max_nodes(limit))?;
    assert_eq!(limited.status, MipStatus::NodeLimit);
    assert_eq!(limited.nodes_explored, limit);
    assert!(limited.best_bound <= limited.objective + 1e-6);
    assert!(limited.best_bound <= full.objective + 1e-6);
    assert!(limited.objective >= full.objective - 1e-6);
    Ok(())
}

#[test]
fn test_time_limit_bounds_root_work() {
    init_logging();
    let instance = generate(80, 10, &GeneratorConfig::default()).unwrap();
    let limit = 0.2;
    let start = std::time::Instant::now();
    let result = solve(&instance, &BendersSettings::default().with_time_limit(limit));
    let elapsed = start.elapsed().as_secs_f64();

    // At most one master relaxation and one subproblem solve past the budget.
    assert!(elapsed < limit + 3.0, "elapsed {elapsed}s");
    match result {
        Ok(solution) => {
            assert!(solution.status.has_solution());
            assert!(solution.best_bound <= solution.objective + 1e-6);
        }
        Err(err) => assert!(matches!(err, Error::Solver(_))),
    }
}

#[test]
fn test_infeasible_instance() {
    let instance = Instance::from_rows(
        vec![30.0],
        vec![10.0, 10.0],
        vec![1.0, 1.0],
        vec![vec![1.0, 1.0]],
    )
    .unwrap();
    let result = solve(&instance, &BendersSettings::default());
    assert!(matches!(result, Err(Error::InfeasibleInstance { .. })));
}
