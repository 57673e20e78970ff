//! Inspect command implementation
//!
//! Prints the summary of a report written by `tissuemix segment`.

use crate::error::{CliError, Result};
use crate::output;
use crate::report::{read_json, SegmentationReport};
use serde::Serialize;
use std::path::Path;
use tissuemix::tissue::{ClusterLabelMap, MappingBasis, Tissue};

/// Compact JSON summary of a report.
#[derive(Serialize)]
struct InspectResult {
    file: String,
    n_voxels: usize,
    n_iter: usize,
    converged: bool,
    final_log_likelihood: Option<f64>,
    label_map: ClusterLabelMap,
    basis: MappingBasis,
    ambiguous: bool,
    tissue_counts: [usize; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_volume_dims: Option<[usize; 3]>,
}

pub(crate) fn run(path: &Path, json: bool) -> Result<()> {
    let report: SegmentationReport = read_json(path)?;
    if report.labels.len() != report.coords.len() {
        return Err(CliError::invalid_format(
            path,
            format!(
                "{} labels but {} coordinates",
                report.labels.len(),
                report.coords.len()
            ),
        ));
    }

    if json {
        let fit = report.model.report();
        let result = InspectResult {
            file: path.display().to_string(),
            n_voxels: report.labels.len(),
            n_iter: fit.n_iter,
            converged: fit.converged,
            final_log_likelihood: fit.final_log_likelihood,
            label_map: report.mapping.map,
            basis: report.mapping.basis,
            ambiguous: report.mapping.ambiguity.is_some(),
            tissue_counts: Tissue::ALL
                .map(|t| report.labels.iter().filter(|&&l| l == t).count()),
            accuracy: report.accuracy.as_ref().map(|a| a.accuracy),
            label_volume_dims: report.label_volume.as_ref().map(|v| v.dims()),
        };
        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::TissueMix(format!("cannot serialize summary: {e}")))?;
        println!("{text}");
    } else {
        output::section("Report");
        output::kv("File", path.display());
        output::print_report(&report);
    }
    Ok(())
}
