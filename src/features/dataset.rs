//! Validated voxel feature datasets.

use super::FeatureLayout;
use crate::error::{Result, TissueMixError};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Voxel index `(i, j, k)` in the source volume.
///
/// Serialized as a three-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct VoxelCoord {
    /// First axis index.
    pub i: usize,
    /// Second axis index.
    pub j: usize,
    /// Third axis index.
    pub k: usize,
}

impl VoxelCoord {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }
}

impl From<[usize; 3]> for VoxelCoord {
    fn from([i, j, k]: [usize; 3]) -> Self {
        Self { i, j, k }
    }
}

impl From<VoxelCoord> for [usize; 3] {
    fn from(c: VoxelCoord) -> Self {
        [c.i, c.j, c.k]
    }
}

/// N in-mask voxels: an N×D feature matrix, the voxel coordinates in the
/// same order, and the layout that names the D columns.
///
/// Construction validates everything the mixture engine relies on, so
/// nothing downstream re-checks finiteness or shape.
///
/// # Examples
///
/// ```
/// use tissuemix::features::{Dataset, FeatureLayout, VoxelCoord};
/// use tissuemix::primitives::Matrix;
///
/// let features = Matrix::from_vec(2, 2, vec![0.1, 0.5, 0.9, 0.4]).unwrap();
/// let layout = FeatureLayout::from_names(&["intensity", "x"]).unwrap();
/// let coords = vec![VoxelCoord::new(0, 0, 0), VoxelCoord::new(1, 0, 0)];
/// let data = Dataset::new(features, coords, layout).unwrap();
/// assert_eq!(data.n_samples(), 2);
///
/// let bad = Matrix::from_vec(1, 2, vec![f64::NAN, 0.0]).unwrap();
/// assert!(Dataset::from_features(bad).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Matrix<f64>,
    coords: Vec<VoxelCoord>,
    layout: FeatureLayout,
}

impl Dataset {
    /// Creates a validated dataset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the matrix has no columns, its width differs
    /// from the layout, the coordinate count differs from the row count, or any value is NaN
    /// or infinite.
    pub fn new(features: Matrix<f64>, coords: Vec<VoxelCoord>, layout: FeatureLayout) -> Result<Self> {
        let (n, d) = features.shape();
        if d == 0 {
            return Err(TissueMixError::invalid_input(
                "feature matrix has no columns",
            ));
        }
        if d != layout.dim() {
            return Err(TissueMixError::invalid_input(format!(
                "feature matrix has {d} columns but the layout declares {}",
                layout.dim()
            )));
        }
        if coords.len() != n {
            return Err(TissueMixError::invalid_input(format!(
                "{} voxel coordinates for {n} feature rows",
                coords.len()
            )));
        }
        for (row, values) in features.rows().enumerate() {
            if let Some((col, &v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(TissueMixError::non_finite(row, col, v));
            }
        }
        Ok(Self {
            features,
            coords,
            layout,
        })
    }

    /// Creates a dataset from row vectors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for ragged rows or any [`Dataset::new`] failure.
    pub fn from_rows(rows: &[Vec<f64>], coords: Vec<VoxelCoord>, layout: FeatureLayout) -> Result<Self> {
        Self::new(Matrix::from_rows(rows)?, coords, layout)
    }

    /// Creates a dataset with a [`FeatureLayout::generic`] layout and
    /// placeholder coordinates `(row, 0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the matrix has no columns or any value is
    /// non-finite.
    pub fn from_features(features: Matrix<f64>) -> Result<Self> {
        let layout = FeatureLayout::generic(features.n_cols())?;
        let coords = (0..features.n_rows())
            .map(|i| VoxelCoord::new(i, 0, 0))
            .collect();
        Self::new(features, coords, layout)
    }

    /// Number of voxels (N).
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.n_rows()
    }

    /// Number of features per voxel (D).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.n_cols()
    }

    /// True if the dataset holds no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    /// The N×D feature matrix.
    #[must_use]
    pub fn features(&self) -> &Matrix<f64> {
        &self.features
    }

    /// Feature vector of one voxel.
    #[must_use]
    pub fn row(&self, idx: usize) -> &[f64] {
        self.features.row(idx)
    }

    /// Voxel coordinates, parallel to the rows.
    #[must_use]
    pub fn coords(&self) -> &[VoxelCoord] {
        &self.coords
    }

    /// Column layout.
    #[must_use]
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Intensity feature of every voxel.
    #[must_use]
    pub fn intensities(&self) -> Vec<f64> {
        self.features.column(self.layout.intensity_index())
    }

    /// N×3 matrix of (CSF, GM, WM) priors, if the layout has them.
    #[must_use]
    pub fn priors(&self) -> Option<Matrix<f64>> {
        let [c, g, w] = self.layout.prior_indices()?;
        let mut out = Matrix::zeros(self.n_samples(), 3);
        for (i, row) in self.features.rows().enumerate() {
            let dst = out.row_mut(i);
            dst[0] = row[c];
            dst[1] = row[g];
            dst[2] = row[w];
        }
        Some(out)
    }

    /// Checks that this dataset has `expected` features per voxel.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` otherwise.
    pub fn check_dim(&self, expected: usize) -> Result<()> {
        if self.n_features() == expected {
            Ok(())
        } else {
            Err(TissueMixError::dimension_mismatch(
                "n_features",
                expected,
                self.n_features(),
            ))
        }
    }
}
