//! Error types for collective communication.

use std::error::Error;
use std::fmt;

/// Errors surfaced by a collective call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A peer left the group while this rank was waiting on it.
    Disconnected {
        /// Rank that departed.
        rank: usize,
    },
    /// A payload did not have the type the collective expected.
    ///
    /// Only observable when ranks issue different collectives at the same
    /// point, which is itself a protocol violation.
    PayloadType {
        /// Rank that sent the payload.
        source: usize,
    },
    /// The outgoing buffer did not have one entry per rank.
    WrongBufferCount {
        /// Group size.
        expected: usize,
        /// Number of entries supplied.
        found: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { rank } => write!(f, "rank {rank} left the communicator"),
            Self::PayloadType { source } => {
                write!(f, "payload from rank {source} has an unexpected type")
            }
            Self::WrongBufferCount { expected, found } => {
                write!(f, "expected {expected} outgoing buffers, got {found}")
            }
        }
    }
}

impl Error for CommError {}
