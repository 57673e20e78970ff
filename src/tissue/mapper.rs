//! Assigns anatomical tissues to anonymous mixture components.
//!
//! Overlap with the prior-probability maps decides. When several assignments
//! score within the ambiguity margin of the best, the intensity ordering
//! (CSF darkest, WM brightest) picks among those candidates only.

use super::{ClusterLabelMap, Tissue};
use crate::cluster::FittedMixture;
use crate::config::MappingConfig;
use crate::error::{Result, TissueMixError};
use crate::features::Dataset;
use crate::primitives::Matrix;
use crate::traits::SoftClusterModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Every bijection of three components, in the order they are scored.
/// `PERMUTATIONS[p][c]` is the tissue index given to component `c`.
const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Which signal produced the final map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingBasis {
    /// The bijection with the highest total prior overlap.
    Overlap,
    /// Several bijections tied on overlap; the one closest to the
    /// mean-intensity ordering was used.
    IntensityFallback,
}

/// Non-fatal disagreement between the two mapping signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingAmbiguity {
    /// The best and second-best bijections scored within the margin.
    AmbiguousOverlap {
        /// Total overlap of the best bijection.
        best: f64,
        /// Total overlap of the runner-up.
        runner_up: f64,
        /// Configured margin.
        margin: f64,
    },
    /// The overlap bijection was used but differs from intensity ordering.
    OrderingDisagreement {
        /// Map chosen by overlap.
        overlap: ClusterLabelMap,
        /// Map implied by intensity ordering.
        intensity: ClusterLabelMap,
    },
}

/// Result of a mapping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingOutcome {
    /// The chosen bijection.
    pub map: ClusterLabelMap,
    /// `overlap[c][t]`: mean prior-t over voxels hard-assigned to component c.
    pub overlap: [[f64; 3]; 3],
    /// Intensity feature of each component mean.
    pub mean_intensities: [f64; 3],
    /// Signal that decided the map.
    pub basis: MappingBasis,
    /// Set when the signals disagreed.
    pub ambiguity: Option<MappingAmbiguity>,
}

/// Maps the three components of a fitted mixture to CSF, GM and WM.
///
/// # Examples
///
/// ```no_run
/// use tissuemix::prelude::*;
///
/// # fn run(model: &FittedMixture, data: &Dataset) -> tissuemix::Result<()> {
/// let outcome = ClusterMapper::default().map(model, data)?;
/// println!("{}", outcome.map);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMapper {
    config: MappingConfig,
}

impl ClusterMapper {
    /// Mapper with the given options.
    #[must_use]
    pub fn new(config: MappingConfig) -> Self {
        Self { config }
    }

    /// Maps using the prior columns of the dataset layout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the layout has no prior columns, the model
    /// does not have exactly three components, or the dataset width differs
    /// from the model.
    pub fn map(&self, model: &FittedMixture, data: &Dataset) -> Result<MappingOutcome> {
        let priors = data.priors().ok_or_else(|| {
            TissueMixError::invalid_input(
                "dataset layout has no prior columns and no priors were supplied",
            )
        })?;
        self.map_with_priors(model, data, &priors)
    }

    /// Maps using an explicit N×3 prior matrix (columns CSF, GM, WM).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a wrong component count or prior shape, or
    /// `DimensionMismatch` if the dataset width differs from the model.
    pub fn map_with_priors(
        &self,
        model: &FittedMixture,
        data: &Dataset,
        priors: &Matrix<f64>,
    ) -> Result<MappingOutcome> {
        let responsibilities = model.predict_proba(data)?;
        self.map_responsibilities(model, data, &responsibilities, priors)
    }

    /// Maps from responsibilities already computed on `data`.
    ///
    /// # Errors
    ///
    /// As [`ClusterMapper::map_with_priors`], plus `InvalidInput` when the
    /// responsibilities do not have one row per voxel.
    pub fn map_responsibilities(
        &self,
        model: &FittedMixture,
        data: &Dataset,
        responsibilities: &Matrix<f64>,
        priors: &Matrix<f64>,
    ) -> Result<MappingOutcome> {
        self.config.validate()?;
        if model.n_components() != 3 {
            return Err(TissueMixError::invalid_input(format!(
                "tissue mapping needs exactly 3 components, model has {}",
                model.n_components()
            )));
        }
        data.check_dim(model.means().n_cols())?;
        let n = data.n_samples();
        if responsibilities.shape() != (n, 3) {
            return Err(TissueMixError::invalid_input(format!(
                "responsibilities are {}x{}, expected {n}x3",
                responsibilities.n_rows(),
                responsibilities.n_cols()
            )));
        }
        if priors.shape() != (n, 3) {
            return Err(TissueMixError::invalid_input(format!(
                "priors are {}x{}, expected {n}x3",
                priors.n_rows(),
                priors.n_cols()
            )));
        }

        let labels = responsibilities.argmax_rows();
        let overlap = overlap_matrix(&labels, priors);
        let intensity_col = data.layout().intensity_index();
        let mut mean_intensities = [0.0; 3];
        for (c, comp) in model.components().iter().enumerate() {
            mean_intensities[c] = comp.mean[intensity_col];
        }

        let scores: Vec<f64> = PERMUTATIONS
            .iter()
            .map(|perm| (0..3).map(|c| overlap[c][perm[c]]).sum())
            .collect();
        let mut best = 0;
        for (p, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = p;
            }
        }
        let runner_up = scores
            .iter()
            .enumerate()
            .filter(|&(p, _)| p != best)
            .map(|(_, &s)| s)
            .fold(f64::NEG_INFINITY, f64::max);

        let overlap_map = ClusterLabelMap::from_permutation(PERMUTATIONS[best]);
        let intensity_map = intensity_order(&mean_intensities);
        let margin = self.config.ambiguity_margin;
        debug!(
            best = scores[best],
            runner_up,
            margin,
            "scored tissue bijections"
        );

        let (map, basis, ambiguity) = if scores[best] - runner_up < margin {
            let chosen = ClusterLabelMap::from_permutation(
                PERMUTATIONS[closest_to_intensity(&scores, best, margin, &intensity_map)],
            );
            warn!(
                best = scores[best],
                runner_up,
                margin,
                map = %chosen,
                "prior overlap is ambiguous, breaking the tie with intensity ordering"
            );
            (
                chosen,
                MappingBasis::IntensityFallback,
                Some(MappingAmbiguity::AmbiguousOverlap {
                    best: scores[best],
                    runner_up,
                    margin,
                }),
            )
        } else if overlap_map != intensity_map {
            warn!(
                overlap = %overlap_map,
                intensity = %intensity_map,
                "prior overlap and intensity ordering disagree, keeping overlap"
            );
            (
                overlap_map,
                MappingBasis::Overlap,
                Some(MappingAmbiguity::OrderingDisagreement {
                    overlap: overlap_map,
                    intensity: intensity_map,
                }),
            )
        } else {
            (overlap_map, MappingBasis::Overlap, None)
        };

        Ok(MappingOutcome {
            map,
            overlap,
            mean_intensities,
            basis,
            ambiguity,
        })
    }
}

/// Among the bijections scoring within `margin` of the best, the one that
/// agrees with `intensity` on the most components. Further ties go to the
/// higher overlap score, then to enumeration order.
fn closest_to_intensity(
    scores: &[f64],
    best: usize,
    margin: f64,
    intensity: &ClusterLabelMap,
) -> usize {
    let agreement = |p: usize| {
        (0..3)
            .filter(|&c| intensity.tissue_of(c).map(Tissue::index) == Some(PERMUTATIONS[p][c]))
            .count()
    };
    let mut chosen = best;
    for p in 0..PERMUTATIONS.len() {
        if scores[best] - scores[p] >= margin {
            continue;
        }
        let better = match agreement(p).cmp(&agreement(chosen)) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => scores[p] > scores[chosen],
            std::cmp::Ordering::Less => false,
        };
        if better {
            chosen = p;
        }
    }
    chosen
}

/// Mean prior per hard-assigned component; a component with no voxels gets a
/// zero row.
fn overlap_matrix(labels: &[usize], priors: &Matrix<f64>) -> [[f64; 3]; 3] {
    let mut sums = [[0.0; 3]; 3];
    let mut counts = [0usize; 3];
    for (&c, row) in labels.iter().zip(priors.rows()) {
        counts[c] += 1;
        for (s, &p) in sums[c].iter_mut().zip(row) {
            *s += p;
        }
    }
    for (row, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            for s in row.iter_mut() {
                *s /= count as f64;
            }
        }
    }
    sums
}

/// Darkest component → CSF, middle → GM, brightest → WM; ties by index.
fn intensity_order(mean_intensities: &[f64; 3]) -> ClusterLabelMap {
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| mean_intensities[a].total_cmp(&mean_intensities[b]));
    let mut perm = [0usize; 3];
    for (rank, &c) in order.iter().enumerate() {
        perm[c] = rank;
    }
    ClusterLabelMap::from_permutation(perm)
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod tests;
