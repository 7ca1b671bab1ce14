//! Particle state carried through the simulation.

use std::fmt;

/// One material point.
///
/// Owned by exactly one rank at a time. `id` is globally unique and is
/// preserved across migrations, which lets tests detect both loss and
/// duplication.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Globally unique identifier.
    pub id: u64,
    /// Position.
    pub position: [f64; 3],
    /// Velocity.
    pub velocity: [f64; 3],
    /// Mass.
    pub mass: f64,
    /// Initial volume.
    pub volume: f64,
    /// Determinant of the deformation gradient.
    pub j: f64,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            id: 0,
            position: [0.0; 3],
            velocity: [0.0; 3],
            mass: 0.0,
            volume: 0.0,
            j: 1.0,
        }
    }
}

impl Particle {
    /// Whether every component of the state is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.mass.is_finite()
            && self.volume.is_finite()
            && self.j.is_finite()
    }
}

/// Named particle field, used by field queries and snapshot writers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleField {
    /// Position (3 components).
    Position,
    /// Velocity (3 components).
    Velocity,
    /// Deformation measure `J` (scalar).
    J,
    /// Mass (scalar).
    Mass,
    /// Volume (scalar).
    Volume,
}

impl ParticleField {
    /// Label used in output files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::J => "j",
            Self::Mass => "mass",
            Self::Volume => "volume",
        }
    }

    /// Number of components per particle.
    pub fn components(self) -> usize {
        match self {
            Self::Position | Self::Velocity => 3,
            Self::J | Self::Mass | Self::Volume => 1,
        }
    }

    /// Append this field's components for `p` to `out`.
    pub fn extend_from(self, p: &Particle, out: &mut Vec<f64>) {
        match self {
            Self::Position => out.extend_from_slice(&p.position),
            Self::Velocity => out.extend_from_slice(&p.velocity),
            Self::J => out.push(p.j),
            Self::Mass => out.push(p.mass),
            Self::Volume => out.push(p.volume),
        }
    }
}

impl fmt::Display for ParticleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
