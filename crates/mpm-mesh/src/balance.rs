//! Tensor-product load balancing.
//!
//! Each axis carries a list of continuous block boundaries (the internal
//! vertices). Per call, the per-rank work is all-gathered and summed per
//! slab; every interior vertex then moves toward the heavier of its two
//! neighbouring slabs, by at most half the narrower slab width. The moved
//! vertices are clamped to the minimum block width and snapped to cell
//! boundaries to produce the new [`Partition`].
//!
//! Keeping the unsnapped vertices between calls lets small corrections
//! accumulate even when a single call moves a vertex less than one cell.

use std::sync::Arc;

use mpm_comm::{all_gather, Communicator};
use mpm_core::GlobalDomain;
use smallvec::SmallVec;

use crate::error::BalanceError;
use crate::mesh::Mesh;
use crate::partition::{CutList, Partition};
use crate::partitioner::Partitioner;

type Vertices = SmallVec<[f64; 8]>;

// Absorbs rounding when a width is an exact multiple of the cell size.
const WIDTH_TOLERANCE: f64 = 1e-9;

/// Moves block boundaries so per-rank work evens out.
pub struct LoadBalancer {
    comm: Arc<dyn Communicator>,
    domain: Arc<GlobalDomain>,
    partition: Partition,
    internal: [Vertices; 3],
    min_cells: usize,
    relaxation: f64,
    imbalance: f64,
}

impl LoadBalancer {
    /// Default fraction of the computed vertex shift applied per call.
    pub const DEFAULT_RELAXATION: f64 = 1.0;

    /// Balancer starting from the mesh's current partition.
    ///
    /// Blocks are never made narrower than `min_domain_width` (rounded up
    /// to whole cells, and at least one cell). Axes with a single block
    /// have no interior vertex to move and are not checked.
    pub fn new(
        comm: Arc<dyn Communicator>,
        mesh: &Mesh,
        min_domain_width: f64,
    ) -> Result<Self, BalanceError> {
        if !min_domain_width.is_finite() || min_domain_width < 0.0 {
            return Err(BalanceError::InvalidMinWidth {
                value: min_domain_width,
            });
        }
        let domain = Arc::clone(mesh.global_domain_arc());
        let min_cells =
            ((min_domain_width / domain.cell_size() - WIDTH_TOLERANCE).ceil() as usize).max(1);
        let partition = mesh.partition().clone();
        let ranks_per_dim = partition.ranks_per_dim();
        let num_cell = domain.num_cell();
        for axis in 0..3 {
            if ranks_per_dim[axis] > 1 && ranks_per_dim[axis] * min_cells > num_cell[axis] {
                return Err(BalanceError::DomainTooSmall {
                    axis,
                    blocks: ranks_per_dim[axis],
                    min_cells,
                    cells: num_cell[axis],
                });
            }
        }
        let internal = vertices_of(&domain, &partition);
        Ok(Self {
            comm,
            domain,
            partition,
            internal,
            min_cells,
            relaxation: Self::DEFAULT_RELAXATION,
            imbalance: 1.0,
        })
    }

    /// Replace the relaxation factor, which must lie in `(0, 1]`.
    pub fn with_relaxation(mut self, relaxation: f64) -> Result<Self, BalanceError> {
        if !(relaxation > 0.0 && relaxation <= 1.0) {
            return Err(BalanceError::InvalidRelaxation { value: relaxation });
        }
        self.relaxation = relaxation;
        Ok(self)
    }

    /// Compute a rebalanced partition from this rank's `work`.
    ///
    /// Collective: every rank must call this with the same mesh topology.
    /// The returned partition has the same blocks per axis as `mesh`.
    pub fn create_balanced_partition(
        &mut self,
        mesh: &Mesh,
        partitioner: &dyn Partitioner,
        work: f64,
    ) -> Result<Partition, BalanceError> {
        let works = all_gather(&*self.comm, work)?;
        if let Some((rank, &bad)) = works
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(BalanceError::InvalidWork { rank, work: bad });
        }

        let expected = mesh.partition().ranks_per_dim();
        let found = partitioner.ranks_per_dim(self.comm.size(), self.domain.num_cell())?;
        if found != expected {
            return Err(BalanceError::TopologyChanged { expected, found });
        }
        if mesh.partition() != &self.partition {
            tracing::debug!(
                generation = %mesh.generation(),
                "load balancer resynchronized with externally replaced mesh"
            );
            self.partition = mesh.partition().clone();
            self.internal = vertices_of(&self.domain, &self.partition);
        }

        let total: f64 = works.iter().sum();
        let mean = total / works.len() as f64;
        let max = works.iter().copied().fold(0.0, f64::max);
        self.imbalance = if mean > 0.0 { max / mean } else { 1.0 };

        let cs = self.domain.cell_size();
        let num_cell = self.domain.num_cell();
        let low = self.domain.bounding_box().low;
        let min_width = self.min_cells as f64 * cs;
        let mut cuts: [CutList; 3] = Default::default();
        for axis in 0..3 {
            let blocks = expected[axis];
            let mut slab_work = vec![0.0; blocks];
            for (rank, w) in works.iter().enumerate() {
                slab_work[self.partition.block_coord(rank)[axis]] += w;
            }
            shift_vertices(&mut self.internal[axis], &slab_work, self.relaxation);
            clamp_spacing(&mut self.internal[axis], min_width);
            cuts[axis] = snap(&self.internal[axis], low[axis], cs, num_cell[axis], self.min_cells);
            tracing::trace!(
                axis,
                slab_work = ?slab_work,
                cuts = ?cuts[axis].as_slice(),
                "rebalanced axis"
            );
        }

        self.partition = Partition::from_cuts(num_cell, cuts)?;
        tracing::debug!(imbalance = self.imbalance, total_work = total, "balanced partition");
        Ok(self.partition.clone())
    }

    /// Snapped bounds of the local block, `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn vertices(&self) -> [f64; 6] {
        let owned = self.partition.owned_cells(self.comm.rank());
        let mut out = [0.0; 6];
        for axis in 0..3 {
            out[axis] = self.domain.node_coordinate(axis, owned[axis].start as i64);
            out[axis + 3] = self.domain.node_coordinate(axis, owned[axis].end as i64);
        }
        out
    }

    /// Unsnapped bounds of the local block, same layout as [`vertices`](Self::vertices).
    pub fn internal_vertices(&self) -> [f64; 6] {
        let block = self.partition.block_coord(self.comm.rank());
        let mut out = [0.0; 6];
        for axis in 0..3 {
            out[axis] = self.internal[axis][block[axis]];
            out[axis + 3] = self.internal[axis][block[axis] + 1];
        }
        out
    }

    /// Max work over mean work in the last call; 1.0 before any call.
    pub fn imbalance(&self) -> f64 {
        self.imbalance
    }

    /// The partition produced by the last call.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Minimum block width in cells.
    pub fn min_block_cells(&self) -> usize {
        self.min_cells
    }
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("rank", &self.comm.rank())
            .field("partition", &self.partition)
            .field("min_cells", &self.min_cells)
            .field("relaxation", &self.relaxation)
            .field("imbalance", &self.imbalance)
            .finish()
    }
}

fn vertices_of(domain: &GlobalDomain, partition: &Partition) -> [Vertices; 3] {
    [0, 1, 2].map(|axis| {
        partition
            .cuts(axis)
            .iter()
            .map(|&c| domain.node_coordinate(axis, c as i64))
            .collect()
    })
}

fn shift_vertices(vertices: &mut [f64], slab_work: &[f64], relaxation: f64) {
    let old: Vertices = vertices.iter().copied().collect();
    for v in 1..slab_work.len() {
        let (wl, wr) = (slab_work[v - 1], slab_work[v]);
        let sum = wl + wr;
        if sum <= 0.0 {
            continue;
        }
        let width_l = old[v] - old[v - 1];
        let width_r = old[v + 1] - old[v];
        // A heavier left slab pulls the vertex left.
        let shift = relaxation * (wl - wr) / sum * width_l.min(width_r) / 2.0;
        vertices[v] = old[v] - shift;
    }
}

fn clamp_spacing(vertices: &mut [f64], min_width: f64) {
    let n = vertices.len() - 1;
    for v in 1..n {
        vertices[v] = vertices[v].max(vertices[v - 1] + min_width);
    }
    for v in (1..n).rev() {
        vertices[v] = vertices[v].min(vertices[v + 1] - min_width);
    }
}

fn snap(vertices: &[f64], low: f64, cs: f64, num_cell: usize, min_cells: usize) -> CutList {
    let n = vertices.len() - 1;
    let mut cuts: CutList = vertices
        .iter()
        .map(|v| ((v - low) / cs).round().max(0.0) as usize)
        .collect();
    cuts[0] = 0;
    cuts[n] = num_cell;
    for c in 1..n {
        cuts[c] = cuts[c].max(cuts[c - 1] + min_cells);
    }
    for c in (1..n).rev() {
        cuts[c] = cuts[c].min(cuts[c + 1].saturating_sub(min_cells));
    }
    cuts
}
