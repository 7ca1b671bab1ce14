//! Time-stepping driver for the distributed MPM solver.
//!
//! Construction goes through [`create_solver`], which maps a backend name
//! to a [`Solver`] over the matching execution context and hands it back
//! as a `Box<dyn Solve>`. [`Solve::solve`] then runs the step loop:
//!
//! 1. integrate particles ([`TimeIntegrator`]),
//! 2. measure local work and compute a balanced partition,
//! 3. build the next [`Mesh`](mpm_mesh::Mesh) generation and rebind the particles,
//! 4. migrate particles to their owning ranks,
//! 5. every `write_freq` steps, write particle and block-bounds snapshots.
//!
//! Every rank runs the same loop and issues the same collectives in the
//! same order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod factory;
pub mod integrator;
pub mod metrics;
pub mod output;
pub mod solver;

pub use config::{ConfigError, SolverConfig};
pub use factory::{create_solver, create_solver_for};
pub use integrator::{ExplicitIntegrator, IntegrationError, TimeIntegrator};
pub use metrics::StepMetrics;
pub use output::{
    DomainWriter, NullWriter, OutputError, ParticleWriter, VtkDomainWriter, VtkParticleWriter,
};
pub use solver::{
    Solve, Solver, SolverError, StepPlan, DOMAIN_ACTUAL, DOMAIN_BALANCER, HALO_MIN,
};
