//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one background mesh instance.
///
/// A mesh is replaced, never mutated, when the domain is rebalanced; each
/// replacement carries the next generation. Consumers that cache geometry
/// derived from a mesh record its generation and compare it on every use,
/// so a stale mesh is rejected instead of silently read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshGeneration(pub u64);

impl MeshGeneration {
    /// The generation of the mesh built at solver construction.
    pub const INITIAL: Self = Self(0);

    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MeshGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MeshGeneration {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
