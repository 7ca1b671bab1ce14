//! Partitioned background mesh for the distributed MPM driver.
//!
//! A [`Mesh`] is the global domain plus one [`Partition`]: a tensor-product
//! split of the global cells into one block per rank. A [`Partitioner`]
//! decides how many blocks go on each axis; the [`LoadBalancer`] moves the
//! cuts between steps so that per-rank work evens out.
//!
//! Meshes are immutable values. Rebalancing produces a new partition, and
//! [`Mesh::with_partition`] turns it into the next mesh generation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod balance;
pub mod error;
pub mod mesh;
pub mod partition;
pub mod partitioner;

pub use balance::LoadBalancer;
pub use error::{BalanceError, MeshError, PartitionError};
pub use mesh::Mesh;
pub use partition::{CutList, Partition};
pub use partitioner::{DimBlockPartitioner, ManualPartitioner, Partitioner};
