//! Core types for the distributed MPM driver.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! values shared by every layer of the workspace: the immutable global
//! domain, particles, boundary conditions, mesh generation tokens, and the
//! execution backends a solver can be instantiated over.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod boundary;
pub mod domain;
pub mod error;
pub mod exec;
pub mod id;
pub mod particle;

pub use backend::{backend_availability, Backend};
pub use boundary::{BoundaryCondition, BoundaryType};
pub use domain::{BoundingBox, GlobalDomain};
pub use error::DomainError;
#[cfg(feature = "openmp")]
pub use exec::HostThreads;
#[cfg(feature = "serial")]
pub use exec::Serial;
pub use exec::ExecutionSpace;
pub use id::MeshGeneration;
pub use particle::{Particle, ParticleField};
