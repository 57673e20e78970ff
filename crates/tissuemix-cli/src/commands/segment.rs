//! Segment command implementation
//!
//! Loads voxel features, fits the mixture, maps components to tissues and
//! writes a report.

use crate::error::{CliError, Result};
use crate::output;
use crate::report::{read_json, write_json, FeatureFile, SegmentationReport};
use std::path::Path;
use tissuemix::config::SegmentationConfig;
use tissuemix::pipeline::segment_with_observer;
use tissuemix::primitives::Matrix;
use tissuemix::segmentation::{assemble_labels, evaluate};
use tracing::{debug, info};

/// Options of `tissuemix segment`.
pub(crate) struct SegmentArgs<'a> {
    pub(crate) features: &'a Path,
    pub(crate) config: Option<&'a Path>,
    pub(crate) output: Option<&'a Path>,
    pub(crate) dims: Option<&'a [usize]>,
    pub(crate) ground_truth: Option<&'a Path>,
    pub(crate) json: bool,
}

pub(crate) fn run(args: &SegmentArgs<'_>) -> Result<()> {
    let config = match args.config {
        Some(path) => load_config(path)?,
        None => SegmentationConfig::default(),
    };
    let dims = args.dims.map(parse_dims).transpose()?;

    let feature_file: FeatureFile = read_json(args.features)?;
    if dims.is_some() && feature_file.coords.is_none() {
        return Err(CliError::InvalidInput(
            "--dims needs voxel coordinates in the feature file".to_string(),
        ));
    }
    let data = feature_file.into_dataset()?;
    info!(
        path = %args.features.display(),
        n_samples = data.n_samples(),
        n_features = data.n_features(),
        "loaded features"
    );

    let seg = segment_with_observer(&data, &config, &mut |event| {
        debug!(
            iteration = event.iteration,
            log_likelihood = event.log_likelihood,
            "fit progress"
        );
    })?;

    let label_volume = dims
        .map(|d| assemble_labels(d, data.coords(), &seg.tissues))
        .transpose()?;

    let accuracy = match args.ground_truth {
        Some(path) => {
            let rows: Vec<[f64; 3]> = read_json(path)?;
            let truth = Matrix::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>())?;
            Some(evaluate(&seg.tissues, &truth)?)
        }
        None => None,
    };

    let report = SegmentationReport {
        model: seg.model,
        mapping: seg.outcome,
        labels: seg.tissues,
        coords: data.coords().to_vec(),
        label_volume,
        accuracy,
    };

    if let Some(path) = args.output {
        write_json(path, &report)?;
        info!(path = %path.display(), "wrote report");
    }

    if args.json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::TissueMix(format!("cannot serialize report: {e}")))?;
        println!("{text}");
    } else {
        output::print_report(&report);
        if let Some(path) = args.output {
            output::kv("Report", path.display());
        }
    }
    Ok(())
}

/// Loads a config file, keeping "missing" and "malformed" apart from
/// out-of-range values.
fn load_config(path: &Path) -> Result<SegmentationConfig> {
    let config: SegmentationConfig = read_json(path)?;
    config.validate()?;
    Ok(config)
}

fn parse_dims(dims: &[usize]) -> Result<[usize; 3]> {
    match dims {
        [nx, ny, nz] if *nx > 0 && *ny > 0 && *nz > 0 => Ok([*nx, *ny, *nz]),
        _ => Err(CliError::InvalidInput(format!(
            "--dims expects three positive sizes NX,NY,NZ, got {dims:?}"
        ))),
    }
}
