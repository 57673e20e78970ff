//! K-Means clustering algorithm.
//!
//! Used to seed the Gaussian mixture means. Lloyd's algorithm with a seeded
//! first centroid and farthest-point selection for the rest, so a given seed
//! always produces the same partition.

use crate::error::{Result, TissueMixError};
use crate::features::Dataset;
use crate::primitives::Matrix;
use crate::traits::{ClusterModel, UnsupervisedEstimator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-Means clustering algorithm.
///
/// # Algorithm
///
/// 1. First centroid: a voxel drawn with the seed
/// 2. Remaining centroids: the voxel farthest from all chosen centroids
/// 3. Assign each sample to nearest centroid
/// 4. Update centroids as mean of assigned samples
/// 5. Repeat until convergence or max iterations
///
/// # Performance
///
/// - Time complexity: O(nkdi) where n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(nk)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on centroid movement.
    tol: f64,
    /// Random seed for initialization.
    random_state: Option<u64>,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: None,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of clusters requested.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Seeded first pick, then farthest-point selection.
    fn init_centroids(&self, x: &Matrix<f64>) -> Matrix<f64> {
        let (n_samples, n_features) = x.shape();
        let mut centroids = Matrix::zeros(self.n_clusters, n_features);

        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(42));
        let first_idx = rng.gen_range(0..n_samples);
        centroids.row_mut(0).copy_from_slice(x.row(first_idx));

        let mut min_distances: Vec<f64> = x
            .rows()
            .map(|p| squared_distance(p, centroids.row(0)))
            .collect();

        for c in 1..self.n_clusters {
            let mut max_dist = 0.0;
            let mut max_idx = 0;
            for (i, &dist) in min_distances.iter().enumerate() {
                if dist > max_dist {
                    max_dist = dist;
                    max_idx = i;
                }
            }
            centroids.row_mut(c).copy_from_slice(x.row(max_idx));

            for (i, min_dist) in min_distances.iter_mut().enumerate() {
                let d = squared_distance(x.row(i), centroids.row(c));
                if d < *min_dist {
                    *min_dist = d;
                }
            }
        }

        centroids
    }

    /// Means of assigned samples; an empty cluster keeps its old centroid.
    fn update_centroids(&self, x: &Matrix<f64>, labels: &[usize], old: &Matrix<f64>) -> Matrix<f64> {
        let n_features = x.n_cols();
        let mut sums = Matrix::zeros(self.n_clusters, n_features);
        let mut counts = vec![0usize; self.n_clusters];

        for (row, &label) in x.rows().zip(labels) {
            counts[label] += 1;
            for (s, &v) in sums.row_mut(label).iter_mut().zip(row) {
                *s += v;
            }
        }

        for (k, &count) in counts.iter().enumerate() {
            if count == 0 {
                sums.row_mut(k).copy_from_slice(old.row(k));
            } else {
                for s in sums.row_mut(k) {
                    *s /= count as f64;
                }
            }
        }
        sums
    }

    fn centroids_converged(&self, old: &Matrix<f64>, new: &Matrix<f64>) -> bool {
        (0..self.n_clusters).all(|k| squared_distance(old.row(k), new.row(k)) <= self.tol * self.tol)
    }
}

/// A fitted k-means partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    centroids: Matrix<f64>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
}

impl KMeansModel {
    /// Cluster centroids (k × d).
    #[must_use]
    pub fn centroids(&self) -> &Matrix<f64> {
        &self.centroids
    }

    /// Labels of the training data.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Within-cluster sum of squares.
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Lloyd iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl UnsupervisedEstimator for KMeans {
    type Fitted = KMeansModel;

    /// Fits the K-Means model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is empty
    /// - Data has fewer samples than clusters
    fn fit(&self, data: &Dataset) -> Result<KMeansModel> {
        let x = data.features();
        let n_samples = x.n_rows();

        if n_samples == 0 {
            return Err(TissueMixError::empty_input("k-means training data"));
        }
        if self.n_clusters == 0 || n_samples < self.n_clusters {
            return Err(TissueMixError::invalid_input(format!(
                "k-means needs 1 <= n_clusters <= n_samples, got n_clusters={} for {n_samples} samples",
                self.n_clusters
            )));
        }

        let mut centroids = self.init_centroids(x);
        let mut labels = assign_labels(x, &centroids);
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let new_centroids = self.update_centroids(x, &labels, &centroids);
            let converged = self.centroids_converged(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = assign_labels(x, &centroids);
            if converged {
                break;
            }
        }

        let inertia = x
            .rows()
            .zip(&labels)
            .map(|(row, &k)| squared_distance(row, centroids.row(k)))
            .sum();

        Ok(KMeansModel {
            centroids,
            labels,
            inertia,
            n_iter,
        })
    }
}

impl ClusterModel for KMeansModel {
    fn n_clusters(&self) -> usize {
        self.centroids.n_rows()
    }

    fn n_features(&self) -> usize {
        self.centroids.n_cols()
    }

    fn predict(&self, data: &Dataset) -> Result<Vec<usize>> {
        data.check_dim(self.n_features())?;
        Ok(assign_labels(data.features(), &self.centroids))
    }
}

/// Nearest centroid per sample; ties go to the lower index.
fn assign_labels(x: &Matrix<f64>, centroids: &Matrix<f64>) -> Vec<usize> {
    x.rows()
        .map(|point| {
            let mut min_dist = f64::INFINITY;
            let mut min_cluster = 0;
            for k in 0..centroids.n_rows() {
                let dist = squared_distance(point, centroids.row(k));
                if dist < min_dist {
                    min_dist = dist;
                    min_cluster = k;
                }
            }
            min_cluster
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Dataset {
        Dataset::from_features(
            Matrix::from_vec(
                6,
                2,
                vec![1.0, 2.0, 1.5, 1.8, 1.0, 0.6, 8.0, 8.0, 9.0, 11.0, 8.5, 9.5],
            )
            .expect("6x2"),
        )
        .expect("finite")
    }

    #[test]
    fn test_separates_two_blobs() {
        let data = two_blobs();
        let model = KMeans::new(2).with_random_state(0).fit(&data).expect("fit");
        let labels = model.labels();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
        assert!(model.n_iter() >= 1);
        assert!(model.inertia() > 0.0);
    }

    #[test]
    fn test_predict_matches_training_labels() {
        let data = two_blobs();
        let model = KMeans::new(2).with_random_state(5).fit(&data).expect("fit");
        assert_eq!(model.predict(&data).expect("same dim"), model.labels());
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = two_blobs();
        let a = KMeans::new(2).with_random_state(9).fit(&data).expect("fit");
        let b = KMeans::new(2).with_random_state(9).fit(&data).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_samples() {
        let data = Dataset::from_features(Matrix::zeros(2, 2)).expect("finite");
        let err = KMeans::new(3).fit(&data).unwrap_err();
        assert!(matches!(err, TissueMixError::InvalidInput { .. }));
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let model = KMeans::new(2).fit(&two_blobs()).expect("fit");
        let other = Dataset::from_features(Matrix::zeros(2, 3)).expect("finite");
        assert!(model.predict(&other).is_err());
    }

    #[test]
    fn test_duplicate_points_do_not_panic() {
        let data = Dataset::from_features(Matrix::from_vec(4, 1, vec![1.0; 4]).expect("4x1"))
            .expect("finite");
        let model = KMeans::new(3).fit(&data).expect("fit");
        assert_eq!(model.labels().len(), 4);
        assert!(model.inertia().abs() < 1e-12);
    }
}
