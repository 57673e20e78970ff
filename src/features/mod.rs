//! Voxel feature vectors.
//!
//! A [`Dataset`] is the only input the mixture engine accepts: an N×D matrix
//! of finite values whose width matches a [`FeatureLayout`], plus the voxel
//! coordinates each row came from. [`FeatureBuilder`] is a reference
//! extractor that produces one from an image volume and a brain mask.

mod builder;
mod dataset;
mod layout;

pub use builder::{FeatureBuilder, PriorMaps};
pub use dataset::{Dataset, VoxelCoord};
pub use layout::{FeatureKind, FeatureLayout};
