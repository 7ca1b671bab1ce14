//! Block decomposition of the global grid.

use std::ops::Range;

use smallvec::SmallVec;

use crate::error::PartitionError;

/// Cut positions along one axis, in global cell indices.
pub type CutList = SmallVec<[usize; 8]>;

/// A tensor-product decomposition of the global cells into one block per rank.
///
/// Along axis `a` there are `ranks_per_dim[a]` slabs separated by
/// `cuts[a]`: slab `i` owns cells `cuts[a][i]..cuts[a][i + 1]`. Blocks are
/// numbered row-major over their slab coordinates, `rank = (i * ny + j) * nz + k`.
///
/// [`from_cuts`](Partition::from_cuts) rejects cut lists that do not start
/// at 0, end at the cell count, and increase strictly, so every global
/// cell belongs to exactly one block by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    ranks_per_dim: [usize; 3],
    cuts: [CutList; 3],
}

impl Partition {
    /// Even split: slabs differ in width by at most one cell, wider first.
    pub fn uniform(num_cell: [usize; 3], ranks_per_dim: [usize; 3]) -> Result<Self, PartitionError> {
        let mut cuts: [CutList; 3] = Default::default();
        for axis in 0..3 {
            let blocks = ranks_per_dim[axis];
            let cells = num_cell[axis];
            if blocks == 0 || blocks > cells {
                return Err(PartitionError::TooManyBlocks {
                    axis,
                    blocks,
                    cells,
                });
            }
            let base = cells / blocks;
            let rem = cells % blocks;
            let mut cursor = 0;
            cuts[axis].push(0);
            for b in 0..blocks {
                cursor += base + usize::from(b < rem);
                cuts[axis].push(cursor);
            }
        }
        Self::from_cuts(num_cell, cuts)
    }

    /// Build from explicit cut lists, validating coverage.
    pub fn from_cuts(num_cell: [usize; 3], cuts: [CutList; 3]) -> Result<Self, PartitionError> {
        let mut ranks_per_dim = [0; 3];
        for axis in 0..3 {
            let c = &cuts[axis];
            if c.len() < 2 {
                return Err(PartitionError::InvalidCuts {
                    axis,
                    reason: format!("need at least 2 cuts, got {}", c.len()),
                });
            }
            if c[0] != 0 {
                return Err(PartitionError::InvalidCuts {
                    axis,
                    reason: format!("first cut is {}, expected 0", c[0]),
                });
            }
            let last = c[c.len() - 1];
            if last != num_cell[axis] {
                return Err(PartitionError::InvalidCuts {
                    axis,
                    reason: format!("last cut is {last}, expected {}", num_cell[axis]),
                });
            }
            if let Some(w) = c.windows(2).find(|w| w[1] <= w[0]) {
                return Err(PartitionError::InvalidCuts {
                    axis,
                    reason: format!("cuts {} and {} are not increasing", w[0], w[1]),
                });
            }
            ranks_per_dim[axis] = c.len() - 1;
        }
        Ok(Self {
            ranks_per_dim,
            cuts,
        })
    }

    /// Blocks per axis.
    pub fn ranks_per_dim(&self) -> [usize; 3] {
        self.ranks_per_dim
    }

    /// Total number of blocks (= ranks).
    pub fn num_ranks(&self) -> usize {
        self.ranks_per_dim.iter().product()
    }

    /// Global cell counts covered.
    pub fn num_cell(&self) -> [usize; 3] {
        [
            self.cuts[0][self.ranks_per_dim[0]],
            self.cuts[1][self.ranks_per_dim[1]],
            self.cuts[2][self.ranks_per_dim[2]],
        ]
    }

    /// Cut list along `axis`.
    pub fn cuts(&self, axis: usize) -> &[usize] {
        &self.cuts[axis]
    }

    /// Slab coordinates of `rank`'s block.
    pub fn block_coord(&self, rank: usize) -> [usize; 3] {
        let [_, ny, nz] = self.ranks_per_dim;
        [rank / (ny * nz), (rank / nz) % ny, rank % nz]
    }

    /// Rank owning the block at slab coordinates `block`.
    pub fn rank_of_block(&self, block: [usize; 3]) -> usize {
        let [_, ny, nz] = self.ranks_per_dim;
        (block[0] * ny + block[1]) * nz + block[2]
    }

    /// Global cells owned by `rank`, per axis.
    pub fn owned_cells(&self, rank: usize) -> [Range<usize>; 3] {
        let b = self.block_coord(rank);
        [0, 1, 2].map(|a| self.cuts[a][b[a]]..self.cuts[a][b[a] + 1])
    }

    /// Number of cells owned by `rank`.
    pub fn block_cell_count(&self, rank: usize) -> usize {
        self.owned_cells(rank).iter().map(|r| r.len()).product()
    }

    /// Rank owning global cell `cell`. Indices past the grid map to the last slab.
    pub fn owner_of_cell(&self, cell: [usize; 3]) -> usize {
        let mut block = [0; 3];
        for axis in 0..3 {
            let idx = self.cuts[axis].partition_point(|&c| c <= cell[axis]);
            block[axis] = idx.saturating_sub(1).min(self.ranks_per_dim[axis] - 1);
        }
        self.rank_of_block(block)
    }

    /// Narrowest block width per axis, in cells.
    pub fn min_block_width(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| {
            self.cuts[a]
                .windows(2)
                .map(|w| w[1] - w[0])
                .min()
                .unwrap_or(0)
        })
    }
}
