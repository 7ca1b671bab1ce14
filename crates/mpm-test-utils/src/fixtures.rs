//! Reusable configuration, particle, and integrator fixtures.
//!
//! - [`box_config`]: a valid [`SolverConfig`] over an axis-aligned box.
//! - [`scatter_particles`]: seeded uniform particles for migration tests.
//! - [`PoisonIntegrator`]: corrupts particle state on a chosen call.

use std::sync::Arc;

use mpm_comm::Communicator;
use mpm_core::{BoundaryCondition, BoundaryType, ExecutionSpace, Particle};
use mpm_mesh::Mesh;
use mpm_particles::ProblemManager;
use mpm_solver::{ExplicitIntegrator, IntegrationError, SolverConfig, TimeIntegrator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Config over `[0, num_cell] * cell_size` with no-slip walls and no output.
pub fn box_config(
    comm: Arc<dyn Communicator>,
    num_cell: [usize; 3],
    cell_size: f64,
    delta_t: f64,
) -> SolverConfig {
    let high = num_cell.map(|n| n as f64 * cell_size);
    let mut config = SolverConfig::new(
        comm,
        [0.0, 0.0, 0.0, high[0], high[1], high[2]],
        num_cell,
        delta_t,
    );
    config.particles_per_cell = 1;
    config.boundary_condition = BoundaryCondition::uniform(BoundaryType::NoSlip);
    config
}

/// `count` particles uniformly distributed in `bounds`, with ids
/// `first_id..first_id + count` and unit mass.
///
/// The same seed always produces the same particles.
pub fn scatter_particles(
    seed: u64,
    count: usize,
    first_id: u64,
    bounds: [f64; 6],
) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let mut position = [0.0; 3];
            for (axis, x) in position.iter_mut().enumerate() {
                *x = rng.gen_range(bounds[axis]..bounds[axis + 3]);
            }
            Particle {
                id: first_id + i as u64,
                position,
                mass: 1.0,
                volume: 1.0,
                ..Particle::default()
            }
        })
        .collect()
}

/// Wraps [`ExplicitIntegrator`] and sets the first local particle's
/// velocity to NaN on call number `poison_at` (zero-based).
///
/// Useful for testing error propagation out of the step loop, and how
/// peers of a failing rank behave.
#[derive(Debug)]
pub struct PoisonIntegrator {
    pub poison_at: usize,
    calls: usize,
}

impl PoisonIntegrator {
    pub fn new(poison_at: usize) -> Self {
        Self {
            poison_at,
            calls: 0,
        }
    }

    /// How many times `step()` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<E: ExecutionSpace> TimeIntegrator<E> for PoisonIntegrator {
    fn name(&self) -> &str {
        "poison"
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
        let n = self.calls;
        self.calls += 1;
        if n == self.poison_at {
            if let Some(p) = pm.particles_mut().first_mut() {
                p.velocity[0] = f64::NAN;
            }
        }
        <ExplicitIntegrator as TimeIntegrator<E>>::step(
            &mut ExplicitIntegrator,
            exec,
            pm,
            mesh,
            delta_t,
            gravity,
            bc,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_is_deterministic_and_in_bounds() {
        let bounds = [0.0, 1.0, 2.0, 1.0, 2.0, 3.0];
        let a = scatter_particles(42, 100, 10, bounds);
        let b = scatter_particles(42, 100, 10, bounds);
        assert_eq!(a, b);
        assert_eq!(a[0].id, 10);
        assert_eq!(a[99].id, 109);
        for p in &a {
            for axis in 0..3 {
                assert!(p.position[axis] >= bounds[axis]);
                assert!(p.position[axis] < bounds[axis + 3]);
            }
        }
        assert_ne!(a, scatter_particles(43, 100, 10, bounds));
    }
}
