//! Benchmark profiles for the distributed MPM driver.
//!
//! - [`column_profile`]: a water column in a closed cubic tank
//! - [`COLUMN_DT`]: the time step the profiles are built with

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use mpm_comm::Communicator;
use mpm_core::{BoundaryCondition, BoundaryType, Particle};
use mpm_solver::SolverConfig;

/// Time step of every profile.
pub const COLUMN_DT: f64 = 0.001;

/// Seeds the lower-left quarter of the tank.
pub fn water_column(x: [f64; 3], _volume: f64, _p: &mut Particle) -> bool {
    x[0] < 0.5 && x[2] < 0.5
}

/// Unit-cube tank with `cells` cells per axis and no-slip walls.
///
/// With [`water_column`] and `particles_per_cell = 2` this seeds
/// `2 * cells^3` particles, all in the lower-left corner, so the first
/// rebalance has real work to move.
pub fn column_profile(comm: Arc<dyn Communicator>, cells: usize) -> SolverConfig {
    let mut config = SolverConfig::new(
        comm,
        [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        [cells; 3],
        COLUMN_DT,
    );
    config.boundary_condition = BoundaryCondition::uniform(BoundaryType::NoSlip);
    config.particles_per_cell = 2;
    config
}
