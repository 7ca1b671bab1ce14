//! Snapshot writers.
//!
//! The solver emits two kinds of snapshot: the particles of every rank
//! ([`ParticleWriter`]) and the bounds of every rank's block
//! ([`DomainWriter`]). Writers are trait objects so runs can go to VTK
//! files, to memory in tests, or nowhere.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use mpm_comm::Communicator;
use mpm_mesh::Mesh;
use mpm_particles::ProblemManager;

mod vtk;

pub use vtk::{VtkDomainWriter, VtkParticleWriter};

// ── OutputError ─────────────────────────────────────────────────

/// Errors from snapshot writers.
#[derive(Debug)]
pub enum OutputError {
    /// A file could not be created or written.
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The progress line could not be written.
    Console {
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "writing {}: {source}", path.display()),
            Self::Console { source } => write!(f, "writing progress: {source}"),
        }
    }
}

impl Error for OutputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Console { source } => Some(source),
        }
    }
}

// ── Writer traits ───────────────────────────────────────────────

/// Writes the local particles at one snapshot.
pub trait ParticleWriter: Send {
    /// Write snapshot `step` taken at simulation time `time`.
    fn write_time_step(
        &mut self,
        comm: &dyn Communicator,
        mesh: &Mesh,
        step: u64,
        time: f64,
        pm: &ProblemManager,
    ) -> Result<(), OutputError>;
}

/// Writes the bounds of the local block.
pub trait DomainWriter: Send {
    /// Write `vertices` (`[xmin, ymin, zmin, xmax, ymax, zmax]`) under `basename`.
    fn write_domain(
        &mut self,
        comm: &dyn Communicator,
        step: u64,
        vertices: &[f64; 6],
        basename: &str,
    ) -> Result<(), OutputError>;
}

/// Discards every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullWriter;

impl ParticleWriter for NullWriter {
    fn write_time_step(
        &mut self,
        _comm: &dyn Communicator,
        _mesh: &Mesh,
        _step: u64,
        _time: f64,
        _pm: &ProblemManager,
    ) -> Result<(), OutputError> {
        Ok(())
    }
}

impl DomainWriter for NullWriter {
    fn write_domain(
        &mut self,
        _comm: &dyn Communicator,
        _step: u64,
        _vertices: &[f64; 6],
        _basename: &str,
    ) -> Result<(), OutputError> {
        Ok(())
    }
}
