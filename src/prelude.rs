//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use tissuemix::prelude::*;
//! ```

pub use crate::cluster::{Component, FitReport, FittedMixture, GaussianMixture, IterationEvent, KMeans};
pub use crate::config::{GmmConfig, InitMethod, MappingConfig, SegmentationConfig};
pub use crate::error::{Result, TissueMixError};
pub use crate::features::{Dataset, FeatureBuilder, FeatureLayout, VoxelCoord};
pub use crate::pipeline::{segment, Segmentation};
pub use crate::primitives::Matrix;
pub use crate::segmentation::{assemble_labels, evaluate, AccuracyReport};
pub use crate::tissue::{ClusterLabelMap, ClusterMapper, MappingOutcome, Tissue};
pub use crate::traits::{ClusterModel, SoftClusterModel, UnsupervisedEstimator};
pub use crate::volume::Volume;
