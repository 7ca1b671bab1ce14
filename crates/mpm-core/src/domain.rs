//! The immutable global simulation domain.

use crate::error::DomainError;

/// Relative tolerance when checking that cells are cubic.
const CELL_SIZE_TOLERANCE: f64 = 1e-9;

/// Axis-aligned box given by its low and high corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Lower corner `[xmin, ymin, zmin]`.
    pub low: [f64; 3],
    /// Upper corner `[xmax, ymax, zmax]`.
    pub high: [f64; 3],
}

impl BoundingBox {
    /// Build from the 6-scalar layout `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn from_array(b: [f64; 6]) -> Self {
        Self {
            low: [b[0], b[1], b[2]],
            high: [b[3], b[4], b[5]],
        }
    }

    /// The 6-scalar layout `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.low[0],
            self.low[1],
            self.low[2],
            self.high[0],
            self.high[1],
            self.high[2],
        ]
    }

    /// Extent along each axis.
    pub fn extent(&self) -> [f64; 3] {
        [
            self.high[0] - self.low[0],
            self.high[1] - self.low[1],
            self.high[2] - self.low[2],
        ]
    }

    /// Whether `p` lies inside the half-open box `[low, high)`.
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.low[a] && p[a] < self.high[a])
    }
}

/// The global Eulerian grid: bounds, cell counts, and periodicity.
///
/// Fixed for the lifetime of a simulation. Every partition produced by a
/// partitioner or the load balancer tiles exactly these cells.
///
/// # Examples
///
/// ```
/// use mpm_core::GlobalDomain;
///
/// let domain = GlobalDomain::new(
///     [0.0, 0.0, 0.0, 1.0, 2.0, 1.0],
///     [10, 20, 10],
///     [false, false, true],
/// )
/// .unwrap();
/// assert_eq!(domain.total_cells(), 2000);
/// assert!((domain.cell_size() - 0.1).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalDomain {
    bounding_box: BoundingBox,
    num_cell: [usize; 3],
    periodic: [bool; 3],
    cell_size: f64,
}

impl GlobalDomain {
    /// Validate and build a global domain.
    ///
    /// Returns an error if the bounds are not finite, an axis has empty
    /// extent or zero cells, or the implied cells are not cubic.
    pub fn new(
        bounding_box: [f64; 6],
        num_cell: [usize; 3],
        periodic: [bool; 3],
    ) -> Result<Self, DomainError> {
        if bounding_box.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::NonFiniteBounds {
                bounds: bounding_box,
            });
        }
        let bbox = BoundingBox::from_array(bounding_box);
        for axis in 0..3 {
            if bbox.high[axis] <= bbox.low[axis] {
                return Err(DomainError::EmptyExtent {
                    axis,
                    low: bbox.low[axis],
                    high: bbox.high[axis],
                });
            }
            if num_cell[axis] == 0 {
                return Err(DomainError::ZeroCells { axis });
            }
        }
        let extent = bbox.extent();
        let widths = [
            extent[0] / num_cell[0] as f64,
            extent[1] / num_cell[1] as f64,
            extent[2] / num_cell[2] as f64,
        ];
        let cell_size = widths[0];
        if widths
            .iter()
            .any(|w| (w - cell_size).abs() > CELL_SIZE_TOLERANCE * cell_size)
        {
            return Err(DomainError::NonUniformCellSize { widths });
        }
        Ok(Self {
            bounding_box: bbox,
            num_cell,
            periodic,
            cell_size,
        })
    }

    /// Global bounding box.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Global cell counts per axis.
    pub fn num_cell(&self) -> [usize; 3] {
        self.num_cell
    }

    /// Periodicity flags per axis.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Edge length of a (cubic) cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Total number of global cells.
    pub fn total_cells(&self) -> usize {
        self.num_cell.iter().product()
    }

    /// Physical coordinate of global node `index` along `axis`.
    pub fn node_coordinate(&self, axis: usize, index: i64) -> f64 {
        self.bounding_box.low[axis] + index as f64 * self.cell_size
    }

    /// Map `p` back into the box along periodic axes.
    ///
    /// Non-periodic axes are returned unchanged.
    pub fn wrap(&self, mut p: [f64; 3]) -> [f64; 3] {
        for (axis, coord) in p.iter_mut().enumerate() {
            if !self.periodic[axis] {
                continue;
            }
            let low = self.bounding_box.low[axis];
            let len = self.bounding_box.high[axis] - low;
            let mut wrapped = (*coord - low).rem_euclid(len) + low;
            // rem_euclid can round up to exactly `len` for tiny negatives.
            if wrapped >= self.bounding_box.high[axis] {
                wrapped = low;
            }
            *coord = wrapped;
        }
        p
    }

    /// Global cell containing `p`, clamped into the grid.
    ///
    /// Periodic axes are wrapped first; positions outside a non-periodic
    /// axis map to the nearest boundary cell.
    pub fn cell_of(&self, p: [f64; 3]) -> [usize; 3] {
        let p = self.wrap(p);
        let mut cell = [0usize; 3];
        for axis in 0..3 {
            let rel = (p[axis] - self.bounding_box.low[axis]) / self.cell_size;
            let max = (self.num_cell[axis] - 1) as f64;
            cell[axis] = rel.floor().clamp(0.0, max) as usize;
        }
        cell
    }
}
