//! Partitioners: how many blocks along each axis.

use crate::error::PartitionError;

/// Decides the block topology for a communicator size.
///
/// A partitioner only chooses the number of blocks per axis; where the
/// cuts fall is decided by [`Partition::uniform`](crate::Partition::uniform)
/// at construction and by the [`LoadBalancer`](crate::LoadBalancer) after.
pub trait Partitioner: Send + Sync {
    /// Blocks per axis for `comm_size` ranks over a grid of `num_cell` cells.
    ///
    /// The result must multiply to `comm_size` and place no more blocks
    /// than cells on any axis.
    fn ranks_per_dim(
        &self,
        comm_size: usize,
        num_cell: [usize; 3],
    ) -> Result<[usize; 3], PartitionError>;
}

fn check_fits(ranks_per_dim: [usize; 3], num_cell: [usize; 3]) -> Result<(), PartitionError> {
    for axis in 0..3 {
        if ranks_per_dim[axis] == 0 || ranks_per_dim[axis] > num_cell[axis] {
            return Err(PartitionError::TooManyBlocks {
                axis,
                blocks: ranks_per_dim[axis],
                cells: num_cell[axis],
            });
        }
    }
    Ok(())
}

/// Fixed, user-chosen blocks per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManualPartitioner {
    /// Blocks per axis.
    pub ranks_per_dim: [usize; 3],
}

impl ManualPartitioner {
    /// Partitioner that always answers `ranks_per_dim`.
    pub fn new(ranks_per_dim: [usize; 3]) -> Self {
        Self { ranks_per_dim }
    }
}

impl Partitioner for ManualPartitioner {
    fn ranks_per_dim(
        &self,
        comm_size: usize,
        num_cell: [usize; 3],
    ) -> Result<[usize; 3], PartitionError> {
        if self.ranks_per_dim.iter().product::<usize>() != comm_size {
            return Err(PartitionError::RankCountMismatch {
                ranks_per_dim: self.ranks_per_dim,
                comm_size,
            });
        }
        check_fits(self.ranks_per_dim, num_cell)?;
        Ok(self.ranks_per_dim)
    }
}

/// Balanced factorization of the rank count.
///
/// Prime factors of `comm_size` are handed out largest first, each to the
/// axis that currently has the most cells per block. Ties go to the lower
/// axis. Blocks therefore stay close to cubic for cubic grids and follow
/// the long axis of elongated ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimBlockPartitioner;

impl DimBlockPartitioner {
    fn prime_factors(mut n: usize) -> Vec<usize> {
        let mut factors = Vec::new();
        let mut p = 2;
        while p * p <= n {
            while n % p == 0 {
                factors.push(p);
                n /= p;
            }
            p += 1;
        }
        if n > 1 {
            factors.push(n);
        }
        factors.reverse();
        factors
    }
}

impl Partitioner for DimBlockPartitioner {
    fn ranks_per_dim(
        &self,
        comm_size: usize,
        num_cell: [usize; 3],
    ) -> Result<[usize; 3], PartitionError> {
        if comm_size == 0 {
            return Err(PartitionError::RankCountMismatch {
                ranks_per_dim: [0; 3],
                comm_size,
            });
        }
        let mut dims = [1usize; 3];
        for factor in Self::prime_factors(comm_size) {
            let mut best = 0;
            let mut best_width = 0.0;
            for axis in 0..3 {
                let width = num_cell[axis] as f64 / dims[axis] as f64;
                if width > best_width {
                    best = axis;
                    best_width = width;
                }
            }
            dims[best] *= factor;
        }
        check_fits(dims, num_cell)?;
        Ok(dims)
    }
}
