//! Tissuemix: unsupervised brain tissue segmentation in pure Rust.
//!
//! Fits a Gaussian mixture to per-voxel feature vectors with
//! Expectation-Maximization, then assigns the three anonymous components to
//! cerebrospinal fluid, gray matter and white matter using prior-probability
//! maps and the intensity ordering of the tissues.
//!
//! # Quick Start
//!
//! ```
//! use tissuemix::prelude::*;
//!
//! // Two features: intensity and one extra column.
//! let data = Dataset::from_features(Matrix::from_vec(6, 2, vec![
//!     0.1, 1.0,
//!     0.12, 1.1,
//!     0.5, 2.0,
//!     0.52, 2.1,
//!     0.9, 3.0,
//!     0.88, 3.1,
//! ]).unwrap()).unwrap();
//!
//! let model = GaussianMixture::new(3).with_random_state(42).fit(&data).unwrap();
//! let proba = model.predict_proba(&data).unwrap();
//! for row in proba.rows() {
//!     assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-6);
//! }
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Matrix and Cholesky factorization
//! - [`features`]: Feature layouts, validated datasets and a reference extractor
//! - [`volume`]: Dense 3D grids
//! - [`cluster`]: Gaussian mixture EM and k-means
//! - [`tissue`]: Tissue classes and the cluster-to-tissue mapper
//! - [`segmentation`]: Label volumes and accuracy against ground truth
//! - [`pipeline`]: Fit, map and label in one call
//! - [`config`]: JSON-loadable run configuration
//!
//! # Logging
//!
//! The library emits [`tracing`] events (per-iteration progress at `debug`,
//! fit summaries at `info`, mapping ambiguity at `warn`) and never installs a
//! subscriber.

pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
pub mod segmentation;
pub mod tissue;
pub mod traits;
pub mod volume;

pub use error::{Result, TissueMixError};
pub use primitives::Matrix;
pub use traits::{ClusterModel, SoftClusterModel, UnsupervisedEstimator};
