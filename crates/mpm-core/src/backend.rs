//! Execution backend tags and their build-time availability.
//!
//! A [`Backend`] names an execution context a solver can be instantiated
//! over. Which tags are usable is decided when the crate is built (cargo
//! features) and exposed at run time through [`Backend::is_enabled`], so
//! the factory has a single "not enabled" error path.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

/// Execution backend identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// Single host thread, in-order execution.
    Serial,
    /// Host thread pool.
    OpenMp,
    /// NVIDIA device.
    Cuda,
    /// AMD device.
    Hip,
}

impl Backend {
    /// Every backend tag, in registry order.
    pub const ALL: [Backend; 4] = [Self::Serial, Self::OpenMp, Self::Cuda, Self::Hip];

    /// Identifier accepted by the factory (`serial`, `openmp`, `cuda`, `hip`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::OpenMp => "openmp",
            Self::Cuda => "cuda",
            Self::Hip => "hip",
        }
    }

    /// Human-facing name used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::OpenMp => "OpenMP",
            Self::Cuda => "CUDA",
            Self::Hip => "HIP",
        }
    }

    /// Whether an execution context for this backend was compiled in.
    ///
    /// No device execution context exists in this build, so `Cuda` and
    /// `Hip` always report `false`.
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Serial => cfg!(feature = "serial"),
            Self::OpenMp => cfg!(feature = "openmp"),
            Self::Cuda | Self::Hip => false,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier that names no known backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseBackendError {
    /// The rejected identifier.
    pub name: String,
}

impl fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid backend '{}'", self.name)
    }
}

impl Error for ParseBackendError {}

impl FromStr for Backend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ParseBackendError {
                name: s.to_string(),
            })
    }
}

/// Ordered capability table: every backend tag and whether it is enabled.
pub fn backend_availability() -> IndexMap<Backend, bool> {
    Backend::ALL
        .into_iter()
        .map(|b| (b, b.is_enabled()))
        .collect()
}
