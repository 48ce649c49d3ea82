use clearance_dp::pricing::{ClearanceConfig, ClearanceProblem, VectorizedBackwardDP};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn config(price_levels: usize) -> ClearanceConfig {
    ClearanceConfig {
        horizon: 10,
        initial_inventory: 12,
        price_levels,
        ..Default::default()
    }
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_induction");
    for levels in [5, 10, 25] {
        let problem = ClearanceProblem::new(&config(levels)).unwrap();

        let dp = problem.backward_dp().unwrap();
        group.bench_with_input(BenchmarkId::new("table", levels), &dp, |b, dp| {
            b.iter(|| black_box(dp.solve().unwrap()))
        });

        let dense = VectorizedBackwardDP::from_problem(&problem);
        group.bench_with_input(BenchmarkId::new("vectorized", levels), &dense, |b, dp| {
            b.iter(|| black_box(dp.solve().unwrap()))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let problem = ClearanceProblem::new(&config(25)).unwrap();
    c.bench_function("transition_table", |b| {
        b.iter(|| black_box(problem.transition_table()))
    });
    c.bench_function("pricing_tensors", |b| b.iter(|| black_box(problem.tensors())));
}

criterion_group!(benches, bench_solvers, bench_build);
criterion_main!(benches);
