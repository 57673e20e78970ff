//! Turning per-voxel tissue labels into volumes and scores.
//!
//! Provides the label-volume assembler and accuracy against a ground-truth
//! probability matrix (pointwise accuracy, per-tissue Dice, confusion matrix).

use crate::error::{Result, TissueMixError};
use crate::features::VoxelCoord;
use crate::primitives::Matrix;
use crate::tissue::Tissue;
use crate::volume::Volume;
use serde::{Deserialize, Serialize};

/// Label code of voxels outside the brain mask.
pub const BACKGROUND: u8 = 0;

/// Writes tissue codes (CSF 1, GM 2, WM 3) into a background-filled volume.
///
/// # Errors
///
/// Returns `InvalidInput` if `coords` and `labels` differ in length or a
/// coordinate lies outside `dims`.
///
/// # Examples
///
/// ```
/// use tissuemix::features::VoxelCoord;
/// use tissuemix::segmentation::assemble_labels;
/// use tissuemix::tissue::Tissue;
///
/// let coords = [VoxelCoord::new(0, 0, 1), VoxelCoord::new(1, 1, 1)];
/// let vol = assemble_labels([2, 2, 2], &coords, &[Tissue::Gm, Tissue::Wm]).unwrap();
/// assert_eq!(vol.get(0, 0, 1), Some(2));
/// assert_eq!(vol.get(1, 1, 1), Some(3));
/// assert_eq!(vol.get(0, 0, 0), Some(0));
/// ```
pub fn assemble_labels(dims: [usize; 3], coords: &[VoxelCoord], labels: &[Tissue]) -> Result<Volume<u8>> {
    if coords.len() != labels.len() {
        return Err(TissueMixError::invalid_input(format!(
            "{} coordinates for {} labels",
            coords.len(),
            labels.len()
        )));
    }
    let mut volume = Volume::filled(dims, BACKGROUND);
    for (&c, &t) in coords.iter().zip(labels) {
        volume.set(c, t.code())?;
    }
    Ok(volume)
}

/// Agreement between predicted and reference tissues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Fraction of voxels whose tissue matches the reference.
    pub accuracy: f64,
    /// Dice coefficient per tissue (CSF, GM, WM). A tissue absent from both
    /// prediction and reference scores 1.
    pub dice: [f64; 3],
    /// `confusion[true][predicted]` voxel counts, in CSF, GM, WM order.
    pub confusion: [[usize; 3]; 3],
    /// Voxels compared.
    pub n_voxels: usize,
}

impl AccuracyReport {
    /// Dice coefficient of one tissue.
    #[must_use]
    pub fn dice_of(&self, tissue: Tissue) -> f64 {
        self.dice[tissue.index()]
    }
}

/// Scores predicted tissues against a ground-truth N×3 probability matrix.
///
/// The reference tissue of each voxel is the arg-max of its row (columns
/// CSF, GM, WM; ties go to the earlier column).
///
/// # Errors
///
/// Returns `InvalidInput` for an empty prediction, a row-count mismatch or a
/// reference that is not N×3.
///
/// # Examples
///
/// ```
/// use tissuemix::primitives::Matrix;
/// use tissuemix::segmentation::evaluate;
/// use tissuemix::tissue::Tissue;
///
/// let truth = Matrix::from_vec(2, 3, vec![0.9, 0.1, 0.0, 0.0, 0.2, 0.8]).unwrap();
/// let report = evaluate(&[Tissue::Csf, Tissue::Gm], &truth).unwrap();
/// assert!((report.accuracy - 0.5).abs() < 1e-12);
/// assert_eq!(report.confusion[2][1], 1);
/// ```
pub fn evaluate(predicted: &[Tissue], ground_truth: &Matrix<f64>) -> Result<AccuracyReport> {
    let n = predicted.len();
    if n == 0 {
        return Err(TissueMixError::empty_input("predicted labels"));
    }
    if ground_truth.shape() != (n, 3) {
        return Err(TissueMixError::invalid_input(format!(
            "ground truth is {}x{}, expected {n}x3",
            ground_truth.n_rows(),
            ground_truth.n_cols()
        )));
    }

    let mut confusion = [[0usize; 3]; 3];
    for (&p, t) in predicted.iter().zip(ground_truth.argmax_rows()) {
        confusion[t][p.index()] += 1;
    }

    let correct: usize = (0..3).map(|t| confusion[t][t]).sum();
    let mut dice = [0.0; 3];
    for (t, d) in dice.iter_mut().enumerate() {
        let tp = confusion[t][t];
        let truth_total: usize = confusion[t].iter().sum();
        let pred_total: usize = confusion.iter().map(|row| row[t]).sum();
        let denom = truth_total + pred_total;
        *d = if denom == 0 {
            1.0
        } else {
            2.0 * tp as f64 / denom as f64
        };
    }

    Ok(AccuracyReport {
        accuracy: correct as f64 / n as f64,
        dice,
        confusion,
        n_voxels: n,
    })
}
