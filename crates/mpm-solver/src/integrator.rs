//! Time integration of particle state.
//!
//! [`TimeIntegrator`] is the seam where MPM kernels plug in. The shipped
//! [`ExplicitIntegrator`] is a kinematic reference: it applies gravity,
//! advects positions, and enforces the boundary condition, which is enough
//! to exercise rebalancing and migration end to end.

use std::error::Error;
use std::fmt;

use mpm_core::{BoundaryCondition, ExecutionSpace};
use mpm_mesh::Mesh;
use mpm_particles::{ParticleError, ProblemManager};

// ── IntegrationError ────────────────────────────────────────────

/// Errors from a time step.
#[derive(Clone, Debug, PartialEq)]
pub enum IntegrationError {
    /// The particle manager rejected the mesh.
    Particle(ParticleError),
    /// Particle state became NaN or infinite.
    NonFinite {
        /// Number of affected local particles.
        count: usize,
        /// Id of the first affected particle.
        first_id: u64,
    },
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Particle(e) => write!(f, "particles: {e}"),
            Self::NonFinite { count, first_id } => write!(
                f,
                "{count} particle(s) have non-finite state, first id {first_id}"
            ),
        }
    }
}

impl Error for IntegrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Particle(e) => Some(e),
            Self::NonFinite { .. } => None,
        }
    }
}

impl From<ParticleError> for IntegrationError {
    fn from(e: ParticleError) -> Self {
        Self::Particle(e)
    }
}

// ── TimeIntegrator ──────────────────────────────────────────────

/// Advances the local particles by one step.
pub trait TimeIntegrator<E: ExecutionSpace>: Send {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Advance every local particle by `delta_t`.
    ///
    /// `gravity` is a magnitude acting along -z. `bc` carries the face
    /// rules and the global node-index bounds of the domain.
    fn step(
        &mut self,
        exec: &E,
        pm: &mut ProblemManager,
        mesh: &Mesh,
        delta_t: f64,
        gravity: f64,
        bc: &BoundaryCondition,
    ) -> Result<(), IntegrationError>;
}

/// Symplectic Euler under gravity with boundary enforcement.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExplicitIntegrator;

impl<E: ExecutionSpace> TimeIntegrator<E> for ExplicitIntegrator {
    fn name(&self) -> &str {
        "explicit"
    }

    fn step(
        &mut self,
        exec: &E,
        pm: &mut ProblemManager,
        mesh: &Mesh,
        delta_t: f64,
        gravity: f64,
        bc: &BoundaryCondition,
    ) -> Result<(), IntegrationError> {
        pm.check_mesh(mesh)?;
        let domain = mesh.global_domain();
        let faces = bc.faces(domain);
        exec.parallel_for(pm.particles_mut(), |_, p| {
            p.velocity[2] -= gravity * delta_t;
            for axis in 0..3 {
                p.position[axis] += p.velocity[axis] * delta_t;
            }
            bc.apply(domain, &faces, p);
        });

        let mut bad = pm.particles().iter().filter(|p| !p.is_finite());
        if let Some(first) = bad.next() {
            return Err(IntegrationError::NonFinite {
                count: 1 + bad.count(),
                first_id: first.id,
            });
        }
        Ok(())
    }
}
