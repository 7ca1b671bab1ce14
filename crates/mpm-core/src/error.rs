//! Error types for global domain construction.

use std::error::Error;
use std::fmt;

/// Errors detected while building a [`GlobalDomain`](crate::GlobalDomain).
#[derive(Clone, Debug, PartialEq)]
pub enum DomainError {
    /// A bounding-box coordinate is NaN or infinite.
    NonFiniteBounds {
        /// The offending 6-scalar box `[xmin, ymin, zmin, xmax, ymax, zmax]`.
        bounds: [f64; 6],
    },
    /// `high <= low` on an axis.
    EmptyExtent {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Lower bound on that axis.
        low: f64,
        /// Upper bound on that axis.
        high: f64,
    },
    /// A global cell count is zero.
    ZeroCells {
        /// Axis index.
        axis: usize,
    },
    /// Cells are not cubic: per-axis widths disagree.
    NonUniformCellSize {
        /// Cell width along each axis.
        widths: [f64; 3],
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteBounds { bounds } => {
                write!(f, "bounding box must be finite, got {bounds:?}")
            }
            Self::EmptyExtent { axis, low, high } => {
                write!(f, "axis {axis} has empty extent [{low}, {high}]")
            }
            Self::ZeroCells { axis } => write!(f, "axis {axis} has zero cells"),
            Self::NonUniformCellSize { widths } => {
                write!(f, "cells must be cubic, got widths {widths:?}")
            }
        }
    }
}

impl Error for DomainError {}
