//! Error types for particle management.

use std::error::Error;
use std::fmt;

use mpm_comm::CommError;
use mpm_core::MeshGeneration;

/// Errors from the [`ProblemManager`](crate::ProblemManager).
#[derive(Clone, Debug, PartialEq)]
pub enum ParticleError {
    /// A collective failed.
    Comm(CommError),
    /// The mesh passed in is not the one last given to `update_mesh`.
    StaleMesh {
        /// Generation the manager is bound to.
        expected: MeshGeneration,
        /// Generation of the mesh passed in.
        found: MeshGeneration,
    },
    /// Migration changed the global particle count.
    CountNotConserved {
        /// Global count before migration.
        before: u64,
        /// Global count after migration.
        after: u64,
    },
    /// `particles_per_cell` was zero.
    ZeroParticlesPerCell,
    /// The material constants are out of range.
    Material(MaterialError),
}

impl fmt::Display for ParticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "communication: {e}"),
            Self::StaleMesh { expected, found } => {
                write!(f, "stale mesh: bound to generation {expected}, got {found}")
            }
            Self::CountNotConserved { before, after } => {
                write!(f, "particle count changed in migration: {before} -> {after}")
            }
            Self::ZeroParticlesPerCell => write!(f, "particles_per_cell must be at least 1"),
            Self::Material(e) => write!(f, "material: {e}"),
        }
    }
}

impl Error for ParticleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Material(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for ParticleError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<MaterialError> for ParticleError {
    fn from(e: MaterialError) -> Self {
        Self::Material(e)
    }
}

// ── MaterialError ───────────────────────────────────────────────

/// Errors from [`MaterialProperties::validate`](crate::MaterialProperties::validate).
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialError {
    /// A property is non-finite, or non-positive where it must be positive.
    InvalidProperty {
        /// Property name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProperty { name, value } => {
                write!(f, "invalid material property {name} = {value}")
            }
        }
    }
}

impl Error for MaterialError {}
