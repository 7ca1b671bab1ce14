//! The partitioned background mesh.

use std::ops::Range;
use std::sync::Arc;

use mpm_comm::Communicator;
use mpm_core::{BoundingBox, GlobalDomain, MeshGeneration};

use crate::error::MeshError;
use crate::partition::Partition;
use crate::partitioner::Partitioner;

/// A structured background mesh distributed over the ranks of a group.
///
/// Meshes are replaced, never mutated: [`with_partition`](Mesh::with_partition)
/// returns a new mesh over the same global domain with the next
/// [`MeshGeneration`]. Holders of per-mesh state keep the generation and
/// compare it to detect a stale mesh.
///
/// Construction enforces halo sufficiency: on every axis split into more
/// than one block, each block is at least `minimum_halo_width` cells wide.
#[derive(Clone, Debug)]
pub struct Mesh {
    domain: Arc<GlobalDomain>,
    partition: Partition,
    rank: usize,
    halo_width: usize,
    minimum_halo_width: usize,
    generation: MeshGeneration,
}

impl Mesh {
    /// Build the initial mesh: the partitioner picks the topology and the
    /// cuts start out uniform.
    ///
    /// The halo width is `max(halo_cell_width, minimum_halo_width)`.
    pub fn new(
        domain: Arc<GlobalDomain>,
        partitioner: &dyn Partitioner,
        halo_cell_width: usize,
        minimum_halo_width: usize,
        comm: &dyn Communicator,
    ) -> Result<Self, MeshError> {
        let ranks_per_dim = partitioner.ranks_per_dim(comm.size(), domain.num_cell())?;
        let partition = Partition::uniform(domain.num_cell(), ranks_per_dim)?;
        Self::from_partition(
            domain,
            partition,
            comm.rank(),
            halo_cell_width,
            minimum_halo_width,
            MeshGeneration::INITIAL,
        )
    }

    /// Build a mesh over an explicit partition.
    pub fn from_partition(
        domain: Arc<GlobalDomain>,
        partition: Partition,
        rank: usize,
        halo_cell_width: usize,
        minimum_halo_width: usize,
        generation: MeshGeneration,
    ) -> Result<Self, MeshError> {
        if partition.num_cell() != domain.num_cell() {
            return Err(MeshError::DomainMismatch {
                partition_cells: partition.num_cell(),
                domain_cells: domain.num_cell(),
            });
        }
        if rank >= partition.num_ranks() {
            return Err(MeshError::RankOutOfRange {
                rank,
                num_ranks: partition.num_ranks(),
            });
        }
        check_halo(&partition, minimum_halo_width)?;
        Ok(Self {
            domain,
            partition,
            rank,
            halo_width: halo_cell_width.max(minimum_halo_width),
            minimum_halo_width,
            generation,
        })
    }

    /// The same global mesh decomposed by `partition`, one generation later.
    pub fn with_partition(&self, partition: Partition) -> Result<Self, MeshError> {
        Self::from_partition(
            Arc::clone(&self.domain),
            partition,
            self.rank,
            self.halo_width,
            self.minimum_halo_width,
            self.generation.next(),
        )
    }

    /// The global domain this mesh discretizes.
    pub fn global_domain(&self) -> &GlobalDomain {
        &self.domain
    }

    /// Shared handle to the global domain.
    pub fn global_domain_arc(&self) -> &Arc<GlobalDomain> {
        &self.domain
    }

    /// The block decomposition.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Local rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Halo width in cells.
    pub fn halo_width(&self) -> usize {
        self.halo_width
    }

    /// Minimum halo width every block must accommodate.
    pub fn minimum_halo_width(&self) -> usize {
        self.minimum_halo_width
    }

    /// Edge length of a cell.
    pub fn cell_size(&self) -> f64 {
        self.domain.cell_size()
    }

    /// Identity of this mesh instance.
    pub fn generation(&self) -> MeshGeneration {
        self.generation
    }

    /// Global cells owned by the local rank.
    pub fn local_owned_cells(&self) -> [Range<usize>; 3] {
        self.partition.owned_cells(self.rank)
    }

    /// Owned cells plus halo, in global (possibly negative) cell indices.
    ///
    /// The halo is only added across a face that has a neighbour: interior
    /// faces and periodic axes.
    pub fn local_ghosted_cells(&self) -> [Range<i64>; 3] {
        let owned = self.local_owned_cells();
        let periodic = self.domain.periodic();
        let num_cell = self.domain.num_cell();
        let halo = self.halo_width as i64;
        [0, 1, 2].map(|a| {
            let start = owned[a].start as i64;
            let end = owned[a].end as i64;
            let lo = if periodic[a] || start > 0 { start - halo } else { start };
            let hi = if periodic[a] || end < num_cell[a] as i64 {
                end + halo
            } else {
                end
            };
            lo..hi
        })
    }

    /// Physical bounds of the local rank's owned block.
    pub fn local_bounds(&self) -> BoundingBox {
        self.block_bounds(self.rank)
    }

    /// Physical bounds of any rank's owned block.
    pub fn block_bounds(&self, rank: usize) -> BoundingBox {
        let owned = self.partition.owned_cells(rank);
        let mut bounds = BoundingBox {
            low: [0.0; 3],
            high: [0.0; 3],
        };
        for axis in 0..3 {
            bounds.low[axis] = self.domain.node_coordinate(axis, owned[axis].start as i64);
            bounds.high[axis] = self.domain.node_coordinate(axis, owned[axis].end as i64);
        }
        bounds
    }

    /// Whether `position` lies within the local block extended by
    /// `halo_cells` cells on every side.
    pub fn contains_with_halo(&self, position: [f64; 3], halo_cells: usize) -> bool {
        let bounds = self.local_bounds();
        let pad = halo_cells as f64 * self.cell_size();
        (0..3).all(|a| {
            position[a] >= bounds.low[a] - pad && position[a] <= bounds.high[a] + pad
        })
    }

    /// Rank owning `position` after periodic wrapping and clamping into the grid.
    pub fn owner_of(&self, position: [f64; 3]) -> usize {
        self.partition.owner_of_cell(self.domain.cell_of(position))
    }

    /// Lowest global node index per axis.
    pub fn min_domain_global_node_index(&self) -> [i64; 3] {
        [0; 3]
    }

    /// Highest global node index per axis.
    pub fn max_domain_global_node_index(&self) -> [i64; 3] {
        self.domain.num_cell().map(|n| n as i64)
    }
}

fn check_halo(partition: &Partition, halo_min: usize) -> Result<(), MeshError> {
    let ranks_per_dim = partition.ranks_per_dim();
    for rank in 0..partition.num_ranks() {
        let owned = partition.owned_cells(rank);
        for axis in 0..3 {
            if ranks_per_dim[axis] > 1 && owned[axis].len() < halo_min {
                return Err(MeshError::BlockTooNarrow {
                    rank,
                    axis,
                    cells: owned[axis].len(),
                    halo_min,
                });
            }
        }
    }
    Ok(())
}
