//! End-to-end segmentation of one dataset: fit, map, label.

use crate::cluster::{FittedMixture, GaussianMixture, IterationEvent};
use crate::config::SegmentationConfig;
use crate::error::{Result, TissueMixError};
use crate::features::Dataset;
use crate::primitives::Matrix;
use crate::tissue::{ClusterMapper, MappingOutcome, Tissue};
use tracing::info;

/// Everything a segmentation run produces.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The fitted mixture.
    pub model: FittedMixture,
    /// Cluster-to-tissue mapping and its diagnostics.
    pub outcome: MappingOutcome,
    /// N×K responsibilities under the final parameters.
    pub responsibilities: Matrix<f64>,
    /// Hard cluster index per voxel, in dataset order.
    pub clusters: Vec<usize>,
    /// Tissue per voxel, in dataset order.
    pub tissues: Vec<Tissue>,
}

/// Fits a three-component mixture and labels every voxel.
///
/// # Errors
///
/// Returns `InvalidHyperparameter` for an invalid configuration or one that
/// does not ask for 3 components, `InvalidInput` when the dataset has no
/// prior columns, and any fit failure unchanged.
pub fn segment(data: &Dataset, config: &SegmentationConfig) -> Result<Segmentation> {
    segment_with_observer(data, config, &mut |_: &IterationEvent| {})
}

/// [`segment`] with per-iteration progress.
///
/// # Errors
///
/// As [`segment`].
pub fn segment_with_observer(
    data: &Dataset,
    config: &SegmentationConfig,
    observer: &mut dyn FnMut(&IterationEvent),
) -> Result<Segmentation> {
    config.validate()?;
    if config.gmm.n_components != 3 {
        return Err(TissueMixError::InvalidHyperparameter {
            param: "n_components".to_string(),
            value: config.gmm.n_components.to_string(),
            constraint: "== 3 for tissue segmentation".to_string(),
        });
    }
    let priors = data.priors().ok_or_else(|| {
        TissueMixError::invalid_input("tissue segmentation needs prior columns in the feature layout")
    })?;

    info!(
        n_samples = data.n_samples(),
        n_features = data.n_features(),
        "segmenting"
    );
    let fit = GaussianMixture::from_config(config.gmm.clone()).fit_with_observer(data, observer)?;
    let outcome = ClusterMapper::new(config.mapping.clone()).map_responsibilities(
        &fit.model,
        data,
        &fit.responsibilities,
        &priors,
    )?;

    let clusters = fit.responsibilities.argmax_rows();
    let tissues = outcome.map.apply(&clusters)?;
    info!(map = %outcome.map, basis = ?outcome.basis, "segmentation complete");

    Ok(Segmentation {
        model: fit.model,
        outcome,
        responsibilities: fit.responsibilities,
        clusters,
        tissues,
    })
}
