//! The time-stepping driver.
//!
//! [`Solver`] owns the mesh, the particles, and the load balancer of one
//! rank and runs the step loop: integrate, measure load, rebalance,
//! rebuild the mesh, migrate particles, and periodically write snapshots.
//!
//! # Collective discipline
//!
//! Every rank must call [`Solve::solve`] with the same arguments. Each
//! step issues the same collectives in the same order on every rank
//! (rebalance, then migration), so ranks stay in lock-step by
//! construction. A rank that fails drops its communicator; its peers then
//! fail at their next collective instead of hanging.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use mpm_comm::{CommError, Communicator};
use mpm_core::{Backend, BoundaryCondition, DomainError, ExecutionSpace, GlobalDomain};
use mpm_mesh::{BalanceError, LoadBalancer, Mesh, MeshError, Partitioner};
use mpm_particles::{ParticleError, ParticleInit, ProblemManager};

use crate::config::{ConfigError, SolverConfig};
use crate::integrator::{ExplicitIntegrator, IntegrationError, TimeIntegrator};
use crate::metrics::StepMetrics;
use crate::output::{DomainWriter, OutputError, ParticleWriter};

/// Minimum halo width, in cells, every mesh block must accommodate.
pub const HALO_MIN: usize = 3;

/// Load-balancer minimum block width, in cells.
const BALANCE_HALO_CELLS: f64 = 3.0;

/// Base name of the snapped block-bounds snapshot.
pub const DOMAIN_ACTUAL: &str = "domain_act";

/// Base name of the unsnapped block-bounds snapshot.
pub const DOMAIN_BALANCER: &str = "domain_lb";

// ── SolverError ─────────────────────────────────────────────────

/// Errors from solver construction and the step loop.
#[derive(Debug)]
pub enum SolverError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// The global domain could not be built.
    Domain(DomainError),
    /// A collective failed outside a collaborator.
    Comm(CommError),
    /// Mesh construction or replacement failed.
    Mesh(MeshError),
    /// Rebalancing failed.
    Balance(BalanceError),
    /// Seeding or migration failed.
    Particle(ParticleError),
    /// The integrator failed.
    Integration(IntegrationError),
    /// A snapshot could not be written.
    Output(OutputError),
    /// `t_final` is NaN, infinite, zero, or negative.
    InvalidFinalTime {
        /// The invalid value.
        value: f64,
    },
    /// `write_freq` is zero.
    ZeroWriteFrequency,
    /// `t_final` is shorter than one time step.
    NoSteps {
        /// Requested end time.
        t_final: f64,
        /// Configured time step.
        delta_t: f64,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Domain(e) => write!(f, "domain: {e}"),
            Self::Comm(e) => write!(f, "communication: {e}"),
            Self::Mesh(e) => write!(f, "mesh: {e}"),
            Self::Balance(e) => write!(f, "load balance: {e}"),
            Self::Particle(e) => write!(f, "particles: {e}"),
            Self::Integration(e) => write!(f, "integration: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::InvalidFinalTime { value } => {
                write!(f, "t_final must be finite and positive, got {value}")
            }
            Self::ZeroWriteFrequency => write!(f, "write_freq must be at least 1"),
            Self::NoSteps { t_final, delta_t } => {
                write!(f, "t_final {t_final} is shorter than one step of {delta_t}")
            }
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Domain(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::Mesh(e) => Some(e),
            Self::Balance(e) => Some(e),
            Self::Particle(e) => Some(e),
            Self::Integration(e) => Some(e),
            Self::Output(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for SolverError {
            fn from(e: $source) -> Self {
                Self::$variant(e)
            }
        })*
    };
}

impl_from! {
    ConfigError => Config,
    DomainError => Domain,
    CommError => Comm,
    MeshError => Mesh,
    BalanceError => Balance,
    ParticleError => Particle,
    IntegrationError => Integration,
    OutputError => Output,
}

// ── StepPlan ────────────────────────────────────────────────────

/// Number of steps and the corrected step size for one `solve` call.
///
/// `num_step = floor(t_final / dt)` and `delta_t = t_final / num_step`, so
/// `num_step` steps land exactly on `t_final`. The effective step can
/// therefore be slightly longer than the configured one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepPlan {
    /// Number of steps.
    pub num_step: u64,
    /// Corrected step size.
    pub delta_t: f64,
}

impl StepPlan {
    /// Plan a run to `t_final` with configured step `dt`.
    pub fn new(t_final: f64, dt: f64) -> Result<Self, SolverError> {
        if !t_final.is_finite() || t_final <= 0.0 {
            return Err(SolverError::InvalidFinalTime { value: t_final });
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep { value: dt }.into());
        }
        let num_step = (t_final / dt).floor() as u64;
        if num_step == 0 {
            return Err(SolverError::NoSteps {
                t_final,
                delta_t: dt,
            });
        }
        Ok(Self {
            num_step,
            delta_t: t_final / num_step as f64,
        })
    }
}

// ── Solve ───────────────────────────────────────────────────────

/// Backend-agnostic interface to a constructed solver.
pub trait Solve {
    /// Run from time 0 to `t_final`, writing snapshots every `write_freq` steps.
    ///
    /// Collective.
    fn solve(&mut self, t_final: f64, write_freq: u64) -> Result<(), SolverError>;

    /// Metrics of the most recent step.
    fn last_metrics(&self) -> &StepMetrics;

    /// Backend the solver runs on.
    fn backend(&self) -> Backend;

    /// Current mesh.
    fn mesh(&self) -> &Mesh;

    /// Local particles.
    fn problem_manager(&self) -> &ProblemManager;
}

// ── Solver ──────────────────────────────────────────────────────

/// Time-stepping driver over execution context `E`.
pub struct Solver<E: ExecutionSpace> {
    exec: E,
    comm: Arc<dyn Communicator>,
    rank: usize,
    delta_t: f64,
    gravity: f64,
    bc: BoundaryCondition,
    mesh: Mesh,
    pm: ProblemManager,
    lb: LoadBalancer,
    partitioner: Arc<dyn Partitioner>,
    integrator: Box<dyn TimeIntegrator<E>>,
    particle_writer: Box<dyn ParticleWriter>,
    domain_writer: Box<dyn DomainWriter>,
    progress: Box<dyn Write + Send>,
    metrics: StepMetrics,
}

impl<E: ExecutionSpace> Solver<E> {
    /// Build a solver with the default execution context.
    ///
    /// Collective: particle ids are assigned across ranks.
    pub fn new<I>(config: SolverConfig, init: &I) -> Result<Self, SolverError>
    where
        I: ParticleInit + ?Sized,
    {
        Self::with_exec(E::default(), config, init)
    }

    /// Build a solver over an explicit execution context.
    pub fn with_exec<I>(exec: E, config: SolverConfig, init: &I) -> Result<Self, SolverError>
    where
        I: ParticleInit + ?Sized,
    {
        config.validate()?;
        let SolverConfig {
            comm,
            bounding_box,
            num_cell,
            periodic,
            partitioner,
            halo_cell_width,
            particles_per_cell,
            material,
            delta_t,
            gravity,
            boundary_condition,
            particle_writer,
            domain_writer,
            progress,
        } = config;

        let domain = Arc::new(GlobalDomain::new(bounding_box, num_cell, periodic)?);
        let mesh = Mesh::new(domain, &*partitioner, halo_cell_width, HALO_MIN, &*comm)?;

        let mut bc = boundary_condition;
        bc.set_index_bounds(
            mesh.min_domain_global_node_index(),
            mesh.max_domain_global_node_index(),
        );

        let pm = ProblemManager::new(
            &exec,
            &mesh,
            init,
            particles_per_cell,
            material,
            Arc::clone(&comm),
        )?;
        let lb = LoadBalancer::new(
            Arc::clone(&comm),
            &mesh,
            BALANCE_HALO_CELLS * mesh.cell_size(),
        )?;

        let rank = comm.rank();
        tracing::info!(
            backend = %E::BACKEND,
            rank,
            ranks = comm.size(),
            ranks_per_dim = ?mesh.partition().ranks_per_dim(),
            local_particles = pm.num_particle(),
            global_particles = pm.global_num_particle(),
            concurrency = exec.concurrency(),
            "solver constructed"
        );

        Ok(Self {
            exec,
            comm,
            rank,
            delta_t,
            gravity,
            bc,
            mesh,
            pm,
            lb,
            partitioner,
            integrator: Box::new(ExplicitIntegrator),
            particle_writer,
            domain_writer,
            progress,
            metrics: StepMetrics::default(),
        })
    }

    /// Replace the integrator.
    pub fn with_integrator(mut self, integrator: Box<dyn TimeIntegrator<E>>) -> Self {
        self.integrator = integrator;
        self
    }

    /// The execution context.
    pub fn exec(&self) -> &E {
        &self.exec
    }

    /// The load balancer.
    pub fn load_balancer(&self) -> &LoadBalancer {
        &self.lb
    }

    /// The boundary condition with its index bounds set from the mesh.
    pub fn boundary_condition(&self) -> &BoundaryCondition {
        &self.bc
    }

    /// Configured (uncorrected) time step.
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    fn write_domains(&mut self) -> Result<(), OutputError> {
        // Always step 0: the files are rewritten in place.
        self.domain_writer
            .write_domain(&*self.comm, 0, &self.lb.vertices(), DOMAIN_ACTUAL)?;
        self.domain_writer.write_domain(
            &*self.comm,
            0,
            &self.lb.internal_vertices(),
            DOMAIN_BALANCER,
        )
    }

    fn write_particles(&mut self, step: u64, time: f64) -> Result<(), OutputError> {
        self.particle_writer
            .write_time_step(&*self.comm, &self.mesh, step, time, &self.pm)
    }
}

impl<E: ExecutionSpace> Solve for Solver<E> {
    fn solve(&mut self, t_final: f64, write_freq: u64) -> Result<(), SolverError> {
        if write_freq == 0 {
            return Err(SolverError::ZeroWriteFrequency);
        }
        let plan = StepPlan::new(t_final, self.delta_t)?;
        tracing::info!(
            rank = self.rank,
            num_step = plan.num_step,
            delta_t = plan.delta_t,
            integrator = self.integrator.name(),
            "starting run"
        );

        self.write_particles(0, 0.0)?;
        self.write_domains()?;

        let mut time = 0.0;
        for t in 0..plan.num_step {
            let writes = t % write_freq == 0;
            if self.rank == 0 && writes {
                writeln!(self.progress, "Step {} / {}", t + 1, plan.num_step)
                    .map_err(|source| OutputError::Console { source })?;
                tracing::info!(step = t + 1, num_step = plan.num_step, time, "progress");
            }
            let step_start = Instant::now();

            // 1. Physics.
            let phase = Instant::now();
            self.integrator.step(
                &self.exec,
                &mut self.pm,
                &self.mesh,
                plan.delta_t,
                self.gravity,
                &self.bc,
            )?;
            let integrate_us = phase.elapsed().as_micros() as u64;

            // 2-3. Measure load and rebalance.
            let phase = Instant::now();
            let work = self.pm.num_particle() as f64;
            let partition =
                self.lb
                    .create_balanced_partition(&self.mesh, &*self.partitioner, work)?;
            let rebalance_us = phase.elapsed().as_micros() as u64;

            // 4. Next mesh generation.
            let phase = Instant::now();
            self.mesh = self.mesh.with_partition(partition)?;
            self.pm.update_mesh(&self.mesh);
            let remesh_us = phase.elapsed().as_micros() as u64;

            // 5. Ownership follows the new mesh.
            let phase = Instant::now();
            let report = self.pm.communicate_particles(&self.mesh, HALO_MIN)?;
            let migrate_us = phase.elapsed().as_micros() as u64;

            // 6. Snapshots, labelled with the pre-increment time.
            let phase = Instant::now();
            if writes {
                self.write_particles(t + 1, time)?;
                self.write_domains()?;
            }
            let output_us = if writes {
                phase.elapsed().as_micros() as u64
            } else {
                0
            };

            time += plan.delta_t;

            self.metrics = StepMetrics {
                step: t + 1,
                total_us: step_start.elapsed().as_micros() as u64,
                integrate_us,
                rebalance_us,
                remesh_us,
                migrate_us,
                output_us,
                local_particles: self.pm.num_particle(),
                sent: report.sent,
                received: report.received,
                imbalance: self.lb.imbalance(),
                kinetic_energy: self.pm.kinetic_energy(&self.exec),
            };
            tracing::debug!(
                rank = self.rank,
                step = t + 1,
                generation = %self.mesh.generation(),
                local_particles = self.metrics.local_particles,
                imbalance = self.metrics.imbalance,
                migrated = report.migrated,
                "step complete"
            );
        }
        Ok(())
    }

    fn last_metrics(&self) -> &StepMetrics {
        &self.metrics
    }

    fn backend(&self) -> Backend {
        E::BACKEND
    }

    fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn problem_manager(&self) -> &ProblemManager {
        &self.pm
    }
}

impl<E: ExecutionSpace> fmt::Debug for Solver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("backend", &E::BACKEND)
            .field("exec", &self.exec)
            .field("rank", &self.rank)
            .field("delta_t", &self.delta_t)
            .field("gravity", &self.gravity)
            .field("mesh_generation", &self.mesh.generation())
            .field("num_particle", &self.pm.num_particle())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_divides_evenly() {
        let plan = StepPlan::new(1.0, 0.1).unwrap();
        assert_eq!(plan.num_step, 10);
        assert!((plan.delta_t - 0.1).abs() < 1e-15);
    }

    #[test]
    fn plan_corrects_step_to_land_on_t_final() {
        let plan = StepPlan::new(1.0, 0.3).unwrap();
        assert_eq!(plan.num_step, 3);
        assert!((plan.delta_t * plan.num_step as f64 - 1.0).abs() < 1e-12);
        assert!(plan.delta_t > 0.3);
    }

    #[test]
    fn plan_rejects_run_shorter_than_one_step() {
        match StepPlan::new(0.05, 0.1) {
            Err(SolverError::NoSteps { t_final, delta_t }) => {
                assert_eq!(t_final, 0.05);
                assert_eq!(delta_t, 0.1);
            }
            other => panic!("expected NoSteps, got {other:?}"),
        }
    }

    #[test]
    fn plan_rejects_bad_final_time() {
        for t_final in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            match StepPlan::new(t_final, 0.1) {
                Err(SolverError::InvalidFinalTime { .. }) => {}
                other => panic!("expected InvalidFinalTime, got {other:?}"),
            }
        }
    }

    #[test]
    fn errors_chain_to_their_source() {
        use std::error::Error;
        let e = SolverError::from(ConfigError::ZeroParticlesPerCell);
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("config: "));
    }
}
