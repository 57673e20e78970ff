//! Dense 3D volumes.
//!
//! Index order is i-major: `idx = (i * ny + j) * nz + k`.

use crate::error::{Result, TissueMixError};
use crate::features::VoxelCoord;
use serde::{Deserialize, Serialize};

/// A dense `nx × ny × nz` grid of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume<T> {
    dims: [usize; 3],
    data: Vec<T>,
}

impl<T: Copy> Volume<T> {
    /// Wraps flat data in i-major order.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `data.len() != nx * ny * nz`.
    pub fn new(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
        let expected = dims[0] * dims[1] * dims[2];
        if data.len() != expected {
            return Err(TissueMixError::dimension_mismatch(
                "volume voxels",
                expected,
                data.len(),
            ));
        }
        Ok(Self { dims, data })
    }

    /// A volume with every voxel set to `value`.
    #[must_use]
    pub fn filled(dims: [usize; 3], value: T) -> Self {
        Self {
            dims,
            data: vec![value; dims[0] * dims[1] * dims[2]],
        }
    }

    /// `[nx, ny, nz]`.
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Total voxel count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if any dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if `(i, j, k)` lies inside the grid.
    #[must_use]
    pub fn contains(&self, c: VoxelCoord) -> bool {
        c.i < self.dims[0] && c.j < self.dims[1] && c.k < self.dims[2]
    }

    /// Flat index of `(i, j, k)`. Caller guarantees bounds.
    #[must_use]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    /// Value at `(i, j, k)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<T> {
        self.contains(VoxelCoord::new(i, j, k))
            .then(|| self.data[self.index(i, j, k)])
    }

    /// Sets the value at `c`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `c` is out of bounds.
    pub fn set(&mut self, c: VoxelCoord, value: T) -> Result<()> {
        if !self.contains(c) {
            return Err(TissueMixError::invalid_input(format!(
                "voxel ({}, {}, {}) outside volume {:?}",
                c.i, c.j, c.k, self.dims
            )));
        }
        let idx = self.index(c.i, c.j, c.k);
        self.data[idx] = value;
        Ok(())
    }

    /// Flat data in i-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Coordinates of every voxel in storage order.
    pub fn coords(&self) -> impl Iterator<Item = VoxelCoord> + '_ {
        let [nx, ny, nz] = self.dims;
        (0..nx).flat_map(move |i| (0..ny).flat_map(move |j| (0..nz).map(move |k| VoxelCoord::new(i, j, k))))
    }
}

impl Volume<f32> {
    /// Voxels strictly above `threshold`.
    #[must_use]
    pub fn threshold_mask(&self, threshold: f32) -> Volume<bool> {
        Volume {
            dims: self.dims,
            data: self.data.iter().map(|&v| v > threshold).collect(),
        }
    }
}

impl Volume<bool> {
    /// Number of `true` voxels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}
