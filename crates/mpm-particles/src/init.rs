//! Particle initialization functors.

use mpm_core::Particle;

/// Decides whether a seeded particle exists and sets its initial state.
///
/// Called once per candidate with the candidate's position and volume. The
/// particle arrives with position, volume, mass and `j = 1` already set;
/// the functor may overwrite any of them (typically the velocity) and
/// returns `false` to discard the candidate.
///
/// Implemented for closures, so most callers never name this trait:
///
/// ```
/// use mpm_particles::ParticleInit;
/// use mpm_core::Particle;
///
/// let dam = |x: [f64; 3], _volume: f64, _p: &mut Particle| x[0] < 0.5;
/// let mut p = Particle::default();
/// assert!(dam.init([0.25, 0.0, 0.0], 1.0, &mut p));
/// assert!(!dam.init([0.75, 0.0, 0.0], 1.0, &mut p));
/// ```
pub trait ParticleInit: Sync {
    /// Initialize one candidate; `false` drops it.
    fn init(&self, position: [f64; 3], volume: f64, particle: &mut Particle) -> bool;
}

impl<F> ParticleInit for F
where
    F: Fn([f64; 3], f64, &mut Particle) -> bool + Sync,
{
    fn init(&self, position: [f64; 3], volume: f64, particle: &mut Particle) -> bool {
        self(position, volume, particle)
    }
}

/// Accepts every candidate unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct FillDomain;

impl ParticleInit for FillDomain {
    fn init(&self, _position: [f64; 3], _volume: f64, _particle: &mut Particle) -> bool {
        true
    }
}
