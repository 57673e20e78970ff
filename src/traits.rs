//! Core traits for clustering estimators.
//!
//! Estimators are immutable configurations; fitting returns a separate,
//! frozen model so several seeds can be tried side by side on the same
//! dataset.

use crate::error::Result;
use crate::features::Dataset;
use crate::primitives::Matrix;

/// Trait for unsupervised learning estimators.
///
/// # Examples
///
/// ```
/// use tissuemix::prelude::*;
///
/// // Two clear clusters
/// let data = Dataset::from_features(Matrix::from_vec(6, 2, vec![
///     0.0, 0.0, 0.1, 0.1, 0.2, 0.0,
///     10.0, 10.0, 10.1, 10.1, 10.0, 10.2,
/// ]).unwrap()).unwrap();
///
/// let model = KMeans::new(2).with_random_state(42).fit(&data).unwrap();
/// let labels = model.predict(&data).unwrap();
/// assert_eq!(labels.len(), 6);
/// assert_ne!(labels[0], labels[5]);
/// ```
pub trait UnsupervisedEstimator {
    /// The fitted model produced by [`UnsupervisedEstimator::fit`].
    type Fitted: ClusterModel;

    /// Fits the model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (invalid data, invalid parameters,
    /// numerical breakdown).
    fn fit(&self, data: &Dataset) -> Result<Self::Fitted>;
}

/// A fitted model that assigns each voxel to one cluster.
pub trait ClusterModel {
    /// Number of clusters.
    fn n_clusters(&self) -> usize;

    /// Number of features the model was fitted on.
    fn n_features(&self) -> usize;

    /// Hard cluster index per voxel, in dataset order.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset dimensionality differs from the
    /// training data.
    fn predict(&self, data: &Dataset) -> Result<Vec<usize>>;
}

/// A fitted model that also yields posterior cluster probabilities.
pub trait SoftClusterModel: ClusterModel {
    /// N×K posterior probabilities; each row sums to 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset dimensionality differs from the
    /// training data.
    fn predict_proba(&self, data: &Dataset) -> Result<Matrix<f64>>;
}
