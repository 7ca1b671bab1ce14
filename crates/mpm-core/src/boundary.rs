//! Domain-edge boundary conditions.

use crate::domain::{BoundingBox, GlobalDomain};
use crate::particle::Particle;

/// Rule applied to a particle that crosses a domain face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundaryType {
    /// No constraint; the particle keeps its state.
    #[default]
    None,
    /// Clamp to the face and remove the normal velocity component.
    FreeSlip,
    /// Clamp to the face and remove all velocity.
    NoSlip,
}

/// Boundary rules per face plus the global node-index range they apply to.
///
/// Faces are ordered `[x-lo, y-lo, z-lo, x-hi, y-hi, z-hi]`, matching the
/// bounding-box layout. The index bounds are overwritten by the solver from
/// the constructed mesh, so callers normally leave them at their defaults.
///
/// # Examples
///
/// ```
/// use mpm_core::{BoundaryCondition, BoundaryType};
///
/// let bc = BoundaryCondition::uniform(BoundaryType::NoSlip);
/// assert_eq!(bc.rules[4], BoundaryType::NoSlip);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundaryCondition {
    /// Rule per face.
    pub rules: [BoundaryType; 6],
    /// Lowest global node index per axis.
    pub min: [i64; 3],
    /// Highest global node index per axis.
    pub max: [i64; 3],
}

impl BoundaryCondition {
    /// Build from per-face rules with zeroed index bounds.
    pub fn new(rules: [BoundaryType; 6]) -> Self {
        Self {
            rules,
            min: [0; 3],
            max: [0; 3],
        }
    }

    /// Same rule on every face.
    pub fn uniform(rule: BoundaryType) -> Self {
        Self::new([rule; 6])
    }

    /// Replace the node-index bounds.
    pub fn set_index_bounds(&mut self, min: [i64; 3], max: [i64; 3]) {
        self.min = min;
        self.max = max;
    }

    /// Physical face positions implied by the index bounds.
    pub fn faces(&self, domain: &GlobalDomain) -> BoundingBox {
        let mut faces = BoundingBox {
            low: [0.0; 3],
            high: [0.0; 3],
        };
        for axis in 0..3 {
            faces.low[axis] = domain.node_coordinate(axis, self.min[axis]);
            faces.high[axis] = domain.node_coordinate(axis, self.max[axis]);
        }
        faces
    }

    /// Apply the rules to one particle.
    ///
    /// Periodic axes wrap the position; other axes apply the rule of the
    /// face the particle crossed. `faces` is normally
    /// [`faces(domain)`](Self::faces), precomputed once per step.
    pub fn apply(&self, domain: &GlobalDomain, faces: &BoundingBox, particle: &mut Particle) {
        let periodic = domain.periodic();
        if periodic.iter().any(|&p| p) {
            particle.position = domain.wrap(particle.position);
        }
        for axis in 0..3 {
            if periodic[axis] {
                continue;
            }
            let (face, bound) = if particle.position[axis] < faces.low[axis] {
                (axis, faces.low[axis])
            } else if particle.position[axis] > faces.high[axis] {
                (axis + 3, faces.high[axis])
            } else {
                continue;
            };
            match self.rules[face] {
                BoundaryType::None => {}
                BoundaryType::FreeSlip => {
                    particle.position[axis] = bound;
                    particle.velocity[axis] = 0.0;
                }
                BoundaryType::NoSlip => {
                    particle.position[axis] = bound;
                    particle.velocity = [0.0; 3];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn domain(periodic: [bool; 3]) -> GlobalDomain {
        GlobalDomain::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0], [10, 10, 10], periodic).unwrap()
    }

    fn bc(rule: BoundaryType) -> BoundaryCondition {
        let mut bc = BoundaryCondition::uniform(rule);
        bc.set_index_bounds([0; 3], [10; 3]);
        bc
    }

    fn particle(position: [f64; 3], velocity: [f64; 3]) -> Particle {
        Particle {
            position,
            velocity,
            ..Particle::default()
        }
    }

    #[test]
    fn faces_follow_index_bounds() {
        let mut b = bc(BoundaryType::None);
        b.set_index_bounds([1, 0, 0], [9, 10, 5]);
        let f = b.faces(&domain([false; 3]));
        assert!((f.low[0] - 0.1).abs() < 1e-12);
        assert!((f.high[0] - 0.9).abs() < 1e-12);
        assert!((f.high[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn free_slip_keeps_tangential_velocity() {
        let d = domain([false; 3]);
        let b = bc(BoundaryType::FreeSlip);
        let mut p = particle([0.5, 0.5, -0.1], [1.0, 2.0, -3.0]);
        b.apply(&d, &b.faces(&d), &mut p);
        assert_eq!(p.position, [0.5, 0.5, 0.0]);
        assert_eq!(p.velocity, [1.0, 2.0, 0.0]);
    }

    #[test]
    fn no_slip_stops_particle() {
        let d = domain([false; 3]);
        let b = bc(BoundaryType::NoSlip);
        let mut p = particle([1.2, 0.5, 0.5], [1.0, 2.0, -3.0]);
        b.apply(&d, &b.faces(&d), &mut p);
        assert_eq!(p.position[0], 1.0);
        assert_eq!(p.velocity, [0.0; 3]);
    }

    #[test]
    fn none_leaves_particle_outside() {
        let d = domain([false; 3]);
        let b = bc(BoundaryType::None);
        let mut p = particle([1.2, 0.5, 0.5], [1.0, 0.0, 0.0]);
        b.apply(&d, &b.faces(&d), &mut p);
        assert_eq!(p.position[0], 1.2);
    }

    #[test]
    fn periodic_axis_wraps_instead_of_clamping() {
        let d = domain([true, false, false]);
        let b = bc(BoundaryType::NoSlip);
        let mut p = particle([1.25, 0.5, 0.5], [1.0, 0.0, 0.0]);
        b.apply(&d, &b.faces(&d), &mut p);
        assert!((p.position[0] - 0.25).abs() < 1e-12);
        assert_eq!(p.velocity[0], 1.0);
    }

    proptest! {
        #[test]
        fn wall_rules_keep_particles_inside(
            x in -2.0f64..3.0,
            y in -2.0f64..3.0,
            z in -2.0f64..3.0,
            no_slip in any::<bool>(),
        ) {
            let d = domain([false; 3]);
            let rule = if no_slip { BoundaryType::NoSlip } else { BoundaryType::FreeSlip };
            let b = bc(rule);
            let faces = b.faces(&d);
            let mut p = particle([x, y, z], [1.0, 1.0, 1.0]);
            b.apply(&d, &faces, &mut p);
            for axis in 0..3 {
                prop_assert!(p.position[axis] >= faces.low[axis]);
                prop_assert!(p.position[axis] <= faces.high[axis]);
            }
        }
    }
}
