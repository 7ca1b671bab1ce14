//! Criterion benchmarks for the solver step loop on one rank.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mpm_bench::{column_profile, water_column, COLUMN_DT};
use mpm_comm::SelfComm;
use mpm_solver::create_solver;

fn bench_step(c: &mut Criterion, backend: &str, cells: usize) {
    let config = column_profile(Arc::new(SelfComm), cells);
    let mut solver = create_solver(backend, config, &water_column).unwrap();

    // Warm up: one step so the first mesh rebuild is done.
    solver.solve(COLUMN_DT, 1).unwrap();

    // Ten steps per iteration; the progress line prints once per solve.
    c.bench_function(&format!("10_steps_{backend}_{cells}cubed"), |b| {
        b.iter(|| {
            solver.solve(10.0 * COLUMN_DT, u64::MAX).unwrap();
            black_box(solver.last_metrics());
        });
    });
}

fn bench_step_serial_16(c: &mut Criterion) {
    bench_step(c, "serial", 16);
}

fn bench_step_serial_32(c: &mut Criterion) {
    bench_step(c, "serial", 32);
}

fn bench_step_openmp_32(c: &mut Criterion) {
    bench_step(c, "openmp", 32);
}

fn bench_construct_32(c: &mut Criterion) {
    c.bench_function("construct_serial_32cubed", |b| {
        b.iter(|| {
            let config = column_profile(Arc::new(SelfComm), 32);
            let solver = create_solver("serial", config, &water_column).unwrap();
            black_box(solver.problem_manager().num_particle());
        });
    });
}

criterion_group!(
    benches,
    bench_step_serial_16,
    bench_step_serial_32,
    bench_step_openmp_32,
    bench_construct_32
);
criterion_main!(benches);
