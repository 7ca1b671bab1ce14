//! Solver configuration, validation, and configuration errors.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use mpm_comm::Communicator;
use mpm_core::backend::ParseBackendError;
use mpm_core::{Backend, BoundaryCondition, DomainError, GlobalDomain};
use mpm_mesh::{DimBlockPartitioner, Partitioner};
use mpm_particles::{MaterialError, MaterialProperties};

use crate::output::{DomainWriter, NullWriter, ParticleWriter};

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected before any simulation state is built.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The backend identifier is not one of `serial`, `openmp`, `cuda`, `hip`.
    InvalidBackend {
        /// The identifier as given.
        name: String,
    },
    /// The backend exists but was not compiled into this build.
    BackendNotEnabled {
        /// The requested backend.
        backend: Backend,
    },
    /// The bounding box, cell counts, or cell shape are invalid.
    Domain(DomainError),
    /// The material properties are invalid.
    Material(MaterialError),
    /// `delta_t` is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// `gravity` is NaN or infinite.
    InvalidGravity {
        /// The invalid value.
        value: f64,
    },
    /// `particles_per_cell` is zero.
    ZeroParticlesPerCell,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBackend { name } => write!(f, "invalid backend '{name}'"),
            Self::BackendNotEnabled { backend } => {
                write!(f, "{} Backend Not Enabled", backend.label())
            }
            Self::Domain(e) => write!(f, "domain: {e}"),
            Self::Material(e) => write!(f, "material: {e}"),
            Self::InvalidTimeStep { value } => {
                write!(f, "delta_t must be finite and positive, got {value}")
            }
            Self::InvalidGravity { value } => write!(f, "gravity must be finite, got {value}"),
            Self::ZeroParticlesPerCell => write!(f, "particles_per_cell must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Material(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseBackendError> for ConfigError {
    fn from(e: ParseBackendError) -> Self {
        Self::InvalidBackend { name: e.name }
    }
}

impl From<DomainError> for ConfigError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

// ── SolverConfig ────────────────────────────────────────────────

/// Everything needed to construct a [`Solver`](crate::Solver).
///
/// Fields are public; [`new`](SolverConfig::new) fills in defaults for
/// everything but the communicator, the grid, and the time step.
/// [`validate()`](SolverConfig::validate) runs before any state is built.
pub struct SolverConfig {
    /// Group of ranks the problem is distributed over.
    pub comm: Arc<dyn Communicator>,
    /// Global bounds, `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub bounding_box: [f64; 6],
    /// Global cell counts per axis.
    pub num_cell: [usize; 3],
    /// Periodicity per axis. Default: none.
    pub periodic: [bool; 3],
    /// Chooses blocks per axis, initially and on every rebalance.
    /// Default: [`DimBlockPartitioner`].
    pub partitioner: Arc<dyn Partitioner>,
    /// Requested halo width in cells; raised to the solver minimum of 3.
    pub halo_cell_width: usize,
    /// Particles seeded per cell along each axis. Default: 2.
    pub particles_per_cell: usize,
    /// Material constants. Default: water-like.
    pub material: MaterialProperties,
    /// Configured time step.
    pub delta_t: f64,
    /// Gravitational acceleration magnitude, acting along -z. Default: 9.81.
    pub gravity: f64,
    /// Per-face boundary rules. Index bounds are overwritten from the mesh.
    pub boundary_condition: BoundaryCondition,
    /// Particle snapshot sink. Default: [`NullWriter`].
    pub particle_writer: Box<dyn ParticleWriter>,
    /// Block-bounds snapshot sink. Default: [`NullWriter`].
    pub domain_writer: Box<dyn DomainWriter>,
    /// Where rank 0 prints `Step <label> / <num_step>`. Default: stdout.
    pub progress: Box<dyn Write + Send>,
}

impl SolverConfig {
    /// Configuration with defaults for every optional field.
    pub fn new(
        comm: Arc<dyn Communicator>,
        bounding_box: [f64; 6],
        num_cell: [usize; 3],
        delta_t: f64,
    ) -> Self {
        Self {
            comm,
            bounding_box,
            num_cell,
            periodic: [false; 3],
            partitioner: Arc::new(DimBlockPartitioner),
            halo_cell_width: 0,
            particles_per_cell: 2,
            material: MaterialProperties::default(),
            delta_t,
            gravity: 9.81,
            boundary_condition: BoundaryCondition::default(),
            particle_writer: Box::new(NullWriter),
            domain_writer: Box::new(NullWriter),
            progress: Box::new(io::stdout()),
        }
    }

    /// Validate every field that can be checked without collectives.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delta_t.is_finite() || self.delta_t <= 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                value: self.delta_t,
            });
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::InvalidGravity {
                value: self.gravity,
            });
        }
        if self.particles_per_cell == 0 {
            return Err(ConfigError::ZeroParticlesPerCell);
        }
        self.material.validate().map_err(ConfigError::Material)?;
        GlobalDomain::new(self.bounding_box, self.num_cell, self.periodic)?;
        Ok(())
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .field("bounding_box", &self.bounding_box)
            .field("num_cell", &self.num_cell)
            .field("periodic", &self.periodic)
            .field("halo_cell_width", &self.halo_cell_width)
            .field("particles_per_cell", &self.particles_per_cell)
            .field("material", &self.material)
            .field("delta_t", &self.delta_t)
            .field("gravity", &self.gravity)
            .field("boundary_condition", &self.boundary_condition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpm_comm::SelfComm;

    fn config() -> SolverConfig {
        SolverConfig::new(
            Arc::new(SelfComm),
            [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            [10, 10, 10],
            0.01,
        )
    }

    #[test]
    fn defaults_are_valid() {
        config().validate().unwrap();
    }

    #[test]
    fn zero_dt_rejected() {
        let mut cfg = config();
        cfg.delta_t = 0.0;
        match cfg.validate() {
            Err(ConfigError::InvalidTimeStep { value }) => assert_eq!(value, 0.0),
            other => panic!("expected InvalidTimeStep, got {other:?}"),
        }
    }

    #[test]
    fn nan_gravity_rejected() {
        let mut cfg = config();
        cfg.gravity = f64::NAN;
        match cfg.validate() {
            Err(ConfigError::InvalidGravity { .. }) => {}
            other => panic!("expected InvalidGravity, got {other:?}"),
        }
    }

    #[test]
    fn zero_particles_per_cell_rejected() {
        let mut cfg = config();
        cfg.particles_per_cell = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroParticlesPerCell));
    }

    #[test]
    fn bad_material_rejected() {
        let mut cfg = config();
        cfg.material.bulk_modulus = -1.0;
        match cfg.validate() {
            Err(ConfigError::Material(MaterialError::InvalidProperty {
                name: "bulk_modulus",
                ..
            })) => {}
            other => panic!("expected Material error, got {other:?}"),
        }
    }

    #[test]
    fn non_cubic_cells_rejected() {
        let mut cfg = config();
        cfg.num_cell = [10, 20, 10];
        match cfg.validate() {
            Err(ConfigError::Domain(DomainError::NonUniformCellSize { .. })) => {}
            other => panic!("expected Domain error, got {other:?}"),
        }
    }

    #[test]
    fn backend_errors_display_like_the_console_contract() {
        assert_eq!(
            ConfigError::InvalidBackend { name: "gpu".into() }.to_string(),
            "invalid backend 'gpu'"
        );
        assert_eq!(
            ConfigError::BackendNotEnabled {
                backend: Backend::Cuda
            }
            .to_string(),
            "CUDA Backend Not Enabled"
        );
        assert_eq!(
            ConfigError::BackendNotEnabled {
                backend: Backend::Hip
            }
            .to_string(),
            "HIP Backend Not Enabled"
        );
    }
}
