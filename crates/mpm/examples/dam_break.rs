//! Dam break: a water column collapsing in a closed tank, run on several
//! in-process ranks with rebalancing every step.
//!
//! Writes VTK snapshots to `dam_break_output/`. Open the `.visit` files in
//! ParaView or VisIt to see all blocks together.
//!
//! Run with:
//!   cargo run --example dam_break -- [backend] [ranks]
//!
//! `backend` is `serial` (default) or `openmp`; `ranks` defaults to 4.
//! Set `RUST_LOG=debug` for per-step events.

use std::process::ExitCode;

use mpm::prelude::*;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// ─── Tank and column ────────────────────────────────────────────

const TANK: [f64; 6] = [0.0, 0.0, 0.0, 2.0, 1.0, 1.0];
const CELLS: [usize; 3] = [32, 16, 16];
const COLUMN_WIDTH: f64 = 0.5;
const COLUMN_HEIGHT: f64 = 0.6;

const DT: f64 = 0.005;
const T_FINAL: f64 = 0.5;
const WRITE_FREQ: u64 = 10;
const OUTPUT_DIR: &str = "dam_break_output";

fn water_column(x: [f64; 3], _volume: f64, _p: &mut Particle) -> bool {
    x[0] < COLUMN_WIDTH && x[2] < COLUMN_HEIGHT
}

fn run_rank(comm: std::sync::Arc<dyn Communicator>, backend: &str) -> Result<(), SolverError> {
    let rank = comm.rank();
    let mut config = SolverConfig::new(comm, TANK, CELLS, DT);
    config.boundary_condition = BoundaryCondition::uniform(BoundaryType::NoSlip);
    config.particles_per_cell = 2;
    config.particle_writer = Box::new(VtkParticleWriter::new(OUTPUT_DIR));
    config.domain_writer = Box::new(VtkDomainWriter::new(OUTPUT_DIR));

    let mut solver = create_solver(backend, config, &water_column)?;
    solver.solve(T_FINAL, WRITE_FREQ)?;

    let m = solver.last_metrics();
    tracing::info!(
        rank,
        particles = m.local_particles,
        imbalance = m.imbalance,
        kinetic_energy = m.kinetic_energy,
        "finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }

    let mut args = std::env::args().skip(1);
    let backend = args.next().unwrap_or_else(|| "serial".to_string());
    let ranks = match args.next().map(|s| s.parse::<usize>()) {
        None => 4,
        Some(Ok(n)) if n > 0 => n,
        Some(_) => {
            eprintln!("ranks must be a positive integer");
            return ExitCode::FAILURE;
        }
    };

    println!("Dam break on {ranks} rank(s), backend {backend}");
    let results = run_spmd(ranks, |comm| run_rank(comm, &backend));

    let mut failed = false;
    for (rank, result) in results.into_iter().enumerate() {
        if let Err(e) = result {
            eprintln!("rank {rank}: {e}");
            failed = true;
        }
    }
    if failed {
        return ExitCode::FAILURE;
    }
    println!("Snapshots written to {OUTPUT_DIR}/");
    ExitCode::SUCCESS
}
