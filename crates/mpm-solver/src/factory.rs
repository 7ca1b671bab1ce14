//! Backend factory: the single dispatch point from a backend name to a solver.

#[cfg(feature = "openmp")]
use mpm_core::HostThreads;
#[cfg(feature = "serial")]
use mpm_core::Serial;
use mpm_core::Backend;
use mpm_particles::ParticleInit;

use crate::config::{ConfigError, SolverConfig};
use crate::solver::{Solve, SolverError};
#[cfg(any(feature = "serial", feature = "openmp"))]
use crate::solver::Solver;

/// Build a solver for the backend named `backend`.
///
/// Names are `serial`, `openmp`, `cuda`, and `hip`. An unknown name fails
/// with [`ConfigError::InvalidBackend`]; a known backend that is not
/// compiled in fails with [`ConfigError::BackendNotEnabled`]. Both are
/// raised before any simulation state is built.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mpm_comm::SelfComm;
/// use mpm_particles::FillDomain;
/// use mpm_solver::{create_solver, ConfigError, SolverConfig, SolverError};
///
/// let config = SolverConfig::new(
///     Arc::new(SelfComm),
///     [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
///     [4, 4, 4],
///     0.01,
/// );
/// match create_solver("gpu", config, &FillDomain) {
///     Err(SolverError::Config(ConfigError::InvalidBackend { name })) => assert_eq!(name, "gpu"),
///     other => panic!("unexpected: {:?}", other.map(|s| s.backend())),
/// }
/// ```
pub fn create_solver<I>(
    backend: &str,
    config: SolverConfig,
    init: &I,
) -> Result<Box<dyn Solve>, SolverError>
where
    I: ParticleInit + ?Sized,
{
    let backend: Backend = backend.parse().map_err(ConfigError::from)?;
    create_solver_for(backend, config, init)
}

/// Build a solver for an already parsed backend tag.
pub fn create_solver_for<I>(
    backend: Backend,
    config: SolverConfig,
    init: &I,
) -> Result<Box<dyn Solve>, SolverError>
where
    I: ParticleInit + ?Sized,
{
    if !backend.is_enabled() {
        return Err(ConfigError::BackendNotEnabled { backend }.into());
    }
    tracing::debug!(%backend, "creating solver");
    let solver: Box<dyn Solve> = match backend {
        #[cfg(feature = "serial")]
        Backend::Serial => Box::new(Solver::<Serial>::new(config, init)?),
        #[cfg(feature = "openmp")]
        Backend::OpenMp => Box::new(Solver::<HostThreads>::new(config, init)?),
        #[allow(unreachable_patterns)]
        other => return Err(ConfigError::BackendNotEnabled { backend: other }.into()),
    };
    Ok(solver)
}
