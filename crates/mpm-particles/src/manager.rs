//! Rank-local particle storage bound to one mesh generation.

use std::sync::Arc;

use mpm_comm::{all_to_all, any, exclusive_scan_sum, Communicator};
use mpm_core::{ExecutionSpace, MeshGeneration, Particle, ParticleField};
use mpm_mesh::Mesh;
use smallvec::SmallVec;

use crate::error::ParticleError;
use crate::init::ParticleInit;
use crate::material::MaterialProperties;

/// Outcome of one [`ProblemManager::communicate_particles`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Whether any rank had a particle outside its halo, so particles moved.
    pub migrated: bool,
    /// Particles this rank sent to other ranks.
    pub sent: usize,
    /// Particles this rank received from other ranks.
    pub received: usize,
    /// Ranks this rank sent particles to.
    pub destinations: SmallVec<[usize; 8]>,
    /// Global particle count, identical before and after.
    pub global_count: u64,
}

/// Owns the particles of one rank and moves them between ranks.
///
/// The manager remembers the [`MeshGeneration`] of the mesh it was last
/// bound to; operations taking a mesh fail with
/// [`ParticleError::StaleMesh`] if handed any other generation.
pub struct ProblemManager {
    particles: Vec<Particle>,
    material: MaterialProperties,
    comm: Arc<dyn Communicator>,
    generation: MeshGeneration,
    global_count: u64,
}

impl ProblemManager {
    /// Seed `particles_per_cell³` particles in every cell owned by this rank.
    ///
    /// Candidates sit at the centres of a regular sub-grid of each cell,
    /// with `volume = cell_size³ / particles_per_cell³`,
    /// `mass = density × volume` and `j = 1`, and are then passed through
    /// `init`. Global ids are contiguous per rank, in rank order.
    ///
    /// Collective.
    pub fn new<E, I>(
        exec: &E,
        mesh: &Mesh,
        init: &I,
        particles_per_cell: usize,
        material: MaterialProperties,
        comm: Arc<dyn Communicator>,
    ) -> Result<Self, ParticleError>
    where
        E: ExecutionSpace,
        I: ParticleInit + ?Sized,
    {
        if particles_per_cell == 0 {
            return Err(ParticleError::ZeroParticlesPerCell);
        }
        material.validate()?;

        let domain = mesh.global_domain();
        let cs = domain.cell_size();
        let low = domain.bounding_box().low;
        let ppc = particles_per_cell;
        let spacing = cs / ppc as f64;
        let volume = spacing * spacing * spacing;
        let mass = material.density * volume;

        let [ri, rj, rk] = mesh.local_owned_cells();
        let per_cell = ppc * ppc * ppc;
        let mut candidates: Vec<(Particle, bool)> =
            Vec::with_capacity(ri.len() * rj.len() * rk.len() * per_cell);
        for i in ri {
            for j in rj.clone() {
                for k in rk.clone() {
                    let cell = [i, j, k];
                    for sub in 0..per_cell {
                        let s = [sub / (ppc * ppc), (sub / ppc) % ppc, sub % ppc];
                        let mut position = [0.0; 3];
                        for a in 0..3 {
                            position[a] = low[a]
                                + cell[a] as f64 * cs
                                + (s[a] as f64 + 0.5) * spacing;
                        }
                        let particle = Particle {
                            position,
                            volume,
                            mass,
                            ..Particle::default()
                        };
                        candidates.push((particle, false));
                    }
                }
            }
        }

        exec.parallel_for(&mut candidates, |_, (particle, keep)| {
            *keep = init.init(particle.position, particle.volume, particle);
        });
        let mut particles: Vec<Particle> = candidates
            .into_iter()
            .filter_map(|(p, keep)| keep.then_some(p))
            .collect();

        let (offset, total) = exclusive_scan_sum(&*comm, particles.len() as u64)?;
        for (i, p) in particles.iter_mut().enumerate() {
            p.id = offset + i as u64;
        }
        tracing::debug!(
            rank = comm.rank(),
            local = particles.len(),
            global = total,
            "seeded particles"
        );
        Ok(Self {
            particles,
            material,
            comm,
            generation: mesh.generation(),
            global_count: total,
        })
    }

    /// Adopt existing particles, keeping their ids.
    ///
    /// Collective: the global count is established here.
    pub fn from_particles(
        mesh: &Mesh,
        particles: Vec<Particle>,
        material: MaterialProperties,
        comm: Arc<dyn Communicator>,
    ) -> Result<Self, ParticleError> {
        material.validate()?;
        let (_, total) = exclusive_scan_sum(&*comm, particles.len() as u64)?;
        Ok(Self {
            particles,
            material,
            comm,
            generation: mesh.generation(),
            global_count: total,
        })
    }

    /// Particles owned by this rank.
    pub fn num_particle(&self) -> usize {
        self.particles.len()
    }

    /// Particles owned by all ranks together.
    pub fn global_num_particle(&self) -> u64 {
        self.global_count
    }

    /// The local particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The local particles, for integrators.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// One field of every local particle, flattened component-wise.
    pub fn field(&self, field: ParticleField) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.particles.len() * field.components());
        for p in &self.particles {
            field.extend_from(p, &mut out);
        }
        out
    }

    /// Material constants.
    pub fn material(&self) -> &MaterialProperties {
        &self.material
    }

    /// The communicator particles migrate over.
    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    /// Generation of the mesh this manager is bound to.
    pub fn mesh_generation(&self) -> MeshGeneration {
        self.generation
    }

    /// Bind to a new mesh.
    pub fn update_mesh(&mut self, mesh: &Mesh) {
        self.generation = mesh.generation();
    }

    /// Fail unless `mesh` is the mesh this manager is bound to.
    pub fn check_mesh(&self, mesh: &Mesh) -> Result<(), ParticleError> {
        if mesh.generation() != self.generation {
            return Err(ParticleError::StaleMesh {
                expected: self.generation,
                found: mesh.generation(),
            });
        }
        Ok(())
    }

    /// Local kinetic energy, `Σ ½ m |v|²`.
    pub fn kinetic_energy<E: ExecutionSpace>(&self, exec: &E) -> f64 {
        exec.parallel_sum(&self.particles, |p| {
            let v2: f64 = p.velocity.iter().map(|v| v * v).sum();
            0.5 * p.mass * v2
        })
    }

    /// Move particles to the ranks that own them under `mesh`.
    ///
    /// Collective. Nothing moves unless some rank holds a particle outside
    /// its block extended by `halo_min` cells. When particles do move, every
    /// particle is sent straight to the owner of its position, so one call
    /// suffices however far a particle travelled. The global count is
    /// verified afterwards.
    pub fn communicate_particles(
        &mut self,
        mesh: &Mesh,
        halo_min: usize,
    ) -> Result<MigrationReport, ParticleError> {
        self.check_mesh(mesh)?;
        let outside = self
            .particles
            .iter()
            .any(|p| !mesh.contains_with_halo(p.position, halo_min));
        if !any(&*self.comm, outside)? {
            return Ok(MigrationReport {
                global_count: self.global_count,
                ..MigrationReport::default()
            });
        }

        let rank = self.comm.rank();
        let mut outgoing: Vec<Vec<Particle>> = (0..self.comm.size()).map(|_| Vec::new()).collect();
        for p in self.particles.drain(..) {
            outgoing[mesh.owner_of(p.position)].push(p);
        }
        let mut report = MigrationReport {
            migrated: true,
            ..MigrationReport::default()
        };
        for (dest, buf) in outgoing.iter().enumerate() {
            if dest != rank && !buf.is_empty() {
                report.sent += buf.len();
                report.destinations.push(dest);
            }
        }

        let incoming = all_to_all(&*self.comm, outgoing)?;
        report.received = incoming
            .iter()
            .enumerate()
            .filter(|(src, _)| *src != rank)
            .map(|(_, buf)| buf.len())
            .sum();
        self.particles = incoming.into_iter().flatten().collect();

        let (_, after) = exclusive_scan_sum(&*self.comm, self.particles.len() as u64)?;
        if after != self.global_count {
            return Err(ParticleError::CountNotConserved {
                before: self.global_count,
                after,
            });
        }
        report.global_count = after;
        tracing::debug!(
            rank,
            sent = report.sent,
            received = report.received,
            local = self.particles.len(),
            "migrated particles"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ProblemManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemManager")
            .field("rank", &self.comm.rank())
            .field("num_particle", &self.particles.len())
            .field("global_count", &self.global_count)
            .field("generation", &self.generation)
            .field("material", &self.material)
            .finish()
    }
}
