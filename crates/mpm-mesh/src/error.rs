//! Error types for partitioning, mesh construction, and load balancing.

use std::error::Error;
use std::fmt;

use mpm_comm::CommError;
use mpm_core::DomainError;

// ── PartitionError ──────────────────────────────────────────────

/// Errors from partitioners and partition validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// The blocks per axis do not multiply to the communicator size.
    RankCountMismatch {
        /// Requested blocks per axis.
        ranks_per_dim: [usize; 3],
        /// Number of ranks available.
        comm_size: usize,
    },
    /// An axis has more blocks than cells.
    TooManyBlocks {
        /// Axis index.
        axis: usize,
        /// Blocks requested on the axis.
        blocks: usize,
        /// Cells available on the axis.
        cells: usize,
    },
    /// A cut list is malformed (wrong ends, not strictly increasing).
    InvalidCuts {
        /// Axis index.
        axis: usize,
        /// What is wrong.
        reason: String,
    },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankCountMismatch {
                ranks_per_dim,
                comm_size,
            } => write!(
                f,
                "blocks per axis {ranks_per_dim:?} do not multiply to {comm_size} ranks"
            ),
            Self::TooManyBlocks { axis, blocks, cells } => {
                write!(f, "axis {axis}: {blocks} blocks for {cells} cells")
            }
            Self::InvalidCuts { axis, reason } => {
                write!(f, "axis {axis}: invalid cuts: {reason}")
            }
        }
    }
}

impl Error for PartitionError {}

// ── MeshError ───────────────────────────────────────────────────

/// Errors from [`Mesh`](crate::Mesh) construction and replacement.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshError {
    /// The global domain is invalid.
    Domain(DomainError),
    /// The partitioner or partition is invalid.
    Partition(PartitionError),
    /// The partition does not tile the mesh's global domain.
    DomainMismatch {
        /// Cells covered by the partition.
        partition_cells: [usize; 3],
        /// Cells of the global domain.
        domain_cells: [usize; 3],
    },
    /// The local rank has no block in the partition.
    RankOutOfRange {
        /// Local rank.
        rank: usize,
        /// Blocks in the partition.
        num_ranks: usize,
    },
    /// A block is narrower than the minimum halo width.
    BlockTooNarrow {
        /// Rank owning the block.
        rank: usize,
        /// Axis index.
        axis: usize,
        /// Block width in cells.
        cells: usize,
        /// Required minimum width in cells.
        halo_min: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "domain: {e}"),
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::DomainMismatch {
                partition_cells,
                domain_cells,
            } => write!(
                f,
                "partition covers {partition_cells:?} cells, domain has {domain_cells:?}"
            ),
            Self::RankOutOfRange { rank, num_ranks } => {
                write!(f, "rank {rank} outside partition of {num_ranks} blocks")
            }
            Self::BlockTooNarrow {
                rank,
                axis,
                cells,
                halo_min,
            } => write!(
                f,
                "block of rank {rank} is {cells} cells wide on axis {axis}, halo needs {halo_min}"
            ),
        }
    }
}

impl Error for MeshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DomainError> for MeshError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<PartitionError> for MeshError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

// ── BalanceError ────────────────────────────────────────────────

/// Errors from the [`LoadBalancer`](crate::LoadBalancer).
#[derive(Clone, Debug, PartialEq)]
pub enum BalanceError {
    /// The work all-gather failed.
    Comm(CommError),
    /// The partitioner failed or the balanced cuts were invalid.
    Partition(PartitionError),
    /// A rank reported a negative or non-finite work value.
    InvalidWork {
        /// Rank that reported it.
        rank: usize,
        /// The reported value.
        work: f64,
    },
    /// The minimum block width is negative or non-finite.
    InvalidMinWidth {
        /// The configured width.
        value: f64,
    },
    /// The relaxation factor is outside `(0, 1]`.
    InvalidRelaxation {
        /// The configured factor.
        value: f64,
    },
    /// An axis cannot hold every block at the minimum width.
    DomainTooSmall {
        /// Axis index.
        axis: usize,
        /// Blocks on the axis.
        blocks: usize,
        /// Minimum block width in cells.
        min_cells: usize,
        /// Cells on the axis.
        cells: usize,
    },
    /// The partitioner produced a different block topology than the mesh.
    TopologyChanged {
        /// Blocks per axis of the current mesh.
        expected: [usize; 3],
        /// Blocks per axis from the partitioner.
        found: [usize; 3],
    },
}

impl fmt::Display for BalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "communication: {e}"),
            Self::Partition(e) => write!(f, "partition: {e}"),
            Self::InvalidWork { rank, work } => {
                write!(f, "rank {rank} reported invalid work {work}")
            }
            Self::InvalidMinWidth { value } => {
                write!(f, "minimum domain width must be finite and >= 0, got {value}")
            }
            Self::InvalidRelaxation { value } => {
                write!(f, "relaxation must be in (0, 1], got {value}")
            }
            Self::DomainTooSmall {
                axis,
                blocks,
                min_cells,
                cells,
            } => write!(
                f,
                "axis {axis}: {blocks} blocks of at least {min_cells} cells do not fit in {cells} cells"
            ),
            Self::TopologyChanged { expected, found } => write!(
                f,
                "partitioner yields {found:?} blocks per axis, mesh has {expected:?}"
            ),
        }
    }
}

impl Error for BalanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for BalanceError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<PartitionError> for BalanceError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}
