//! JSON files read and written by the CLI.

use crate::error::{CliError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tissuemix::cluster::FittedMixture;
use tissuemix::features::{Dataset, FeatureLayout, VoxelCoord};
use tissuemix::segmentation::AccuracyReport;
use tissuemix::tissue::{MappingOutcome, Tissue};
use tissuemix::volume::Volume;

/// Voxel features as produced by an external extractor.
///
/// ```json
/// {"columns": ["intensity", "prior_csf", "prior_gm", "prior_wm"],
///  "rows": [[0.2, 0.8, 0.1, 0.1]],
///  "coords": [[3, 4, 5]]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FeatureFile {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<f64>>,
    #[serde(default)]
    pub(crate) coords: Option<Vec<VoxelCoord>>,
}

impl FeatureFile {
    /// Validated dataset; missing coordinates become `(row, 0, 0)`.
    pub(crate) fn into_dataset(self) -> Result<Dataset> {
        let layout = FeatureLayout::from_names(self.columns.as_slice())?;
        let coords = match self.coords {
            Some(c) => c,
            None => (0..self.rows.len()).map(|i| VoxelCoord::new(i, 0, 0)).collect(),
        };
        Ok(Dataset::from_rows(&self.rows, coords, layout)?)
    }
}

/// Everything `segment` produces; `inspect` reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SegmentationReport {
    pub(crate) model: FittedMixture,
    pub(crate) mapping: MappingOutcome,
    pub(crate) labels: Vec<Tissue>,
    pub(crate) coords: Vec<VoxelCoord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) label_volume: Option<Volume<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) accuracy: Option<AccuracyReport>,
}

/// Reads and parses a JSON file, separating missing files from bad content.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| CliError::invalid_format(path, e))
}

/// Writes `value` as pretty JSON.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::TissueMix(format!("cannot serialize report: {e}")))?;
    fs::write(path, text)?;
    Ok(())
}
