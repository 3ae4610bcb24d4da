use std::hint::black_box;

use cflp::benders::{solve, BendersSettings, SubproblemSolver};
use cflp::instance::{generate, GeneratorConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_subproblem(c: &mut Criterion) {
    let mut group = c.benchmark_group("subproblem");
    for (customers, facilities) in [(20, 5), (50, 10), (100, 10)] {
        let instance = generate(customers, facilities, &GeneratorConfig::default())
            .expect("generator defaults are valid");
        let opening = vec![1.0; facilities];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{customers}x{facilities}")),
            &opening,
            |b, opening| {
                let mut subproblem = SubproblemSolver::new(&instance);
                b.iter(|| subproblem.solve(black_box(opening)).expect("all facilities open"));
            },
        );
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("benders");
    group.sample_size(10);
    for (customers, facilities) in [(20, 5), (40, 8)] {
        let instance = generate(customers, facilities, &GeneratorConfig::default())
            .expect("generator defaults are valid");
        for relaxation_cuts in [true, false] {
            let settings = BendersSettings::default().with_relaxation_cuts(relaxation_cuts);
            let label = if relaxation_cuts { "with_fractional" } else { "integer_only" };
            group.bench_with_input(
                BenchmarkId::new(label, format!("{customers}x{facilities}")),
                &settings,
                |b, settings| b.iter(|| solve(black_box(&instance), settings).expect("feasible")),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_subproblem, bench_solve);
criterion_main!(benches);
