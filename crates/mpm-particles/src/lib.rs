//! Particle side of the distributed MPM driver.
//!
//! The [`ProblemManager`] owns the particles of one rank. It seeds them
//! from a [`ParticleInit`] functor, answers field queries for integrators
//! and snapshot writers, and migrates particles to their owning ranks
//! after the mesh has been rebalanced.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod init;
pub mod manager;
pub mod material;

pub use error::{MaterialError, ParticleError};
pub use init::{FillDomain, ParticleInit};
pub use manager::{MigrationReport, ProblemManager};
pub use material::MaterialProperties;
