//! Test utilities for MPM driver development.
//!
//! Provides recording implementations of the snapshot writer traits
//! ([`ParticleWriter`], [`DomainWriter`]) and a [`SharedBuffer`] for the
//! progress line, whose output can be inspected after a run, plus reusable
//! fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mpm_comm::Communicator;
use mpm_core::MeshGeneration;
use mpm_mesh::Mesh;
use mpm_particles::ProblemManager;
use mpm_solver::{DomainWriter, OutputError, ParticleWriter};

/// One call to [`ParticleWriter::write_time_step`], as seen by a recorder.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleRecord {
    pub rank: usize,
    pub step: u64,
    pub time: f64,
    pub generation: MeshGeneration,
    pub ids: Vec<u64>,
}

/// One call to [`DomainWriter::write_domain`], as seen by a recorder.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainRecord {
    pub rank: usize,
    pub step: u64,
    pub basename: String,
    pub vertices: [f64; 6],
}

/// Shared, append-only log of records.
///
/// The writer half is moved into the solver config; keep a clone of the
/// log to inspect what was written.
#[derive(Debug)]
pub struct RecordLog<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for RecordLog<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for RecordLog<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> RecordLog<T> {
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: T) {
        self.lock().push(record);
    }

    /// Copy of every record so far, in write order.
    pub fn records(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// [`ParticleWriter`] that records instead of writing files.
#[derive(Clone, Debug, Default)]
pub struct RecordingParticleWriter {
    log: RecordLog<ParticleRecord>,
}

impl RecordingParticleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the records this writer produces.
    pub fn log(&self) -> RecordLog<ParticleRecord> {
        self.log.clone()
    }
}

impl ParticleWriter for RecordingParticleWriter {
    fn write_time_step(
        &mut self,
        comm: &dyn Communicator,
        mesh: &Mesh,
        step: u64,
        time: f64,
        pm: &ProblemManager,
    ) -> Result<(), OutputError> {
        self.log.push(ParticleRecord {
            rank: comm.rank(),
            step,
            time,
            generation: mesh.generation(),
            ids: pm.particles().iter().map(|p| p.id).collect(),
        });
        Ok(())
    }
}

/// [`DomainWriter`] that records instead of writing files.
#[derive(Clone, Debug, Default)]
pub struct RecordingDomainWriter {
    log: RecordLog<DomainRecord>,
}

impl RecordingDomainWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the records this writer produces.
    pub fn log(&self) -> RecordLog<DomainRecord> {
        self.log.clone()
    }
}

impl DomainWriter for RecordingDomainWriter {
    fn write_domain(
        &mut self,
        comm: &dyn Communicator,
        step: u64,
        vertices: &[f64; 6],
        basename: &str,
    ) -> Result<(), OutputError> {
        self.log.push(DomainRecord {
            rank: comm.rank(),
            step,
            basename: basename.to_string(),
            vertices: *vertices,
        });
        Ok(())
    }
}

/// In-memory `Write` sink whose clones share one buffer.
///
/// Hand a clone to [`SolverConfig::progress`](mpm_solver::SolverConfig::progress)
/// and read the console output back with [`contents`](SharedBuffer::contents).
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
