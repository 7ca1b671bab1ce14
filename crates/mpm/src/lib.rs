//! MPM: a distributed explicit material-point-method driver.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all sub-crates. For most users, adding `mpm` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use mpm::prelude::*;
//!
//! let mut config = SolverConfig::new(
//!     Arc::new(SelfComm),
//!     [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
//!     [8, 8, 8],
//!     0.01,
//! );
//! config.boundary_condition = BoundaryCondition::uniform(BoundaryType::NoSlip);
//!
//! // Fill the lower half of the box with water at rest.
//! let init = |x: [f64; 3], _volume: f64, _p: &mut Particle| x[2] < 0.5;
//! let mut solver = create_solver("serial", config, &init).unwrap();
//! solver.solve(0.1, 5).unwrap();
//! assert_eq!(solver.problem_manager().global_num_particle(), 8 * 8 * 4 * 8);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mpm-core` | Domain, boundary conditions, particles, backends, execution contexts |
//! | [`comm`] | `mpm-comm` | Communicators and collectives |
//! | [`mesh`] | `mpm-mesh` | Partitions, partitioners, meshes, the load balancer |
//! | [`particles`] | `mpm-particles` | Particle storage, seeding, migration |
//! | [`solver`] | `mpm-solver` | Configuration, the step loop, integrators, snapshot writers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and execution contexts (`mpm-core`).
///
/// Contains [`types::GlobalDomain`], [`types::BoundaryCondition`],
/// [`types::Particle`], and the [`types::Backend`] registry.
pub use mpm_core as types;

/// Communicators and collectives (`mpm-comm`).
///
/// [`comm::run_spmd`] runs one closure per rank on in-process threads.
pub use mpm_comm as comm;

/// Partitions and load balancing (`mpm-mesh`).
pub use mpm_mesh as mesh;

/// Particle storage and migration (`mpm-particles`).
pub use mpm_particles as particles;

/// The time-stepping driver (`mpm-solver`).
///
/// Start from [`solver::create_solver`] or [`solver::Solver`].
pub use mpm_solver as solver;

/// Common imports for typical MPM usage.
///
/// ```rust
/// use mpm::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mpm_core::{
        Backend, BoundaryCondition, BoundaryType, ExecutionSpace, GlobalDomain, Particle,
    };

    // Communication
    pub use mpm_comm::{run_spmd, Communicator, SelfComm};

    // Mesh
    pub use mpm_mesh::{DimBlockPartitioner, ManualPartitioner, Partitioner};

    // Particles
    pub use mpm_particles::{FillDomain, MaterialProperties, ParticleInit};

    // Solver
    pub use mpm_solver::{
        create_solver, NullWriter, Solve, SolverConfig, SolverError, VtkDomainWriter,
        VtkParticleWriter,
    };
}
