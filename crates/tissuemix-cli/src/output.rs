//! Output formatting utilities

use crate::report::SegmentationReport;
use colored::Colorize;
use tissuemix::tissue::{MappingAmbiguity, Tissue};

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Print an error message
pub(crate) fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Fraction as a percentage with one decimal.
pub(crate) fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Human-readable summary of a segmentation report.
pub(crate) fn print_report(report: &SegmentationReport) {
    let fit = report.model.report();
    section("Fit");
    kv("Voxels", report.labels.len());
    kv("Features", report.model.means().n_cols());
    kv("Iterations", fit.n_iter);
    kv(
        "Converged",
        if fit.converged {
            "yes".green().to_string()
        } else {
            "no (iteration budget reached)".yellow().to_string()
        },
    );
    if let Some(ll) = fit.final_log_likelihood {
        kv("Log-likelihood", format!("{ll:.4}"));
    }

    section("Tissue mapping");
    kv("Label map", report.mapping.map);
    kv("Basis", format!("{:?}", report.mapping.basis));
    for (c, intensity) in report.mapping.mean_intensities.iter().enumerate() {
        kv(&format!("Component {c} mean intensity"), format!("{intensity:.4}"));
    }
    match &report.mapping.ambiguity {
        Some(MappingAmbiguity::AmbiguousOverlap {
            best,
            runner_up,
            margin,
        }) => warning(&format!(
            "prior overlap ambiguous (best {best:.4}, runner-up {runner_up:.4}, margin {margin}); used intensity ordering"
        )),
        Some(MappingAmbiguity::OrderingDisagreement { intensity, .. }) => warning(&format!(
            "prior overlap disagrees with intensity ordering {intensity}"
        )),
        None => {}
    }

    section("Labels");
    let n = report.labels.len().max(1) as f64;
    for tissue in Tissue::ALL {
        let count = report.labels.iter().filter(|&&t| t == tissue).count();
        kv(
            tissue.name(),
            format!("{count} voxels ({})", percent(count as f64 / n)),
        );
    }
    if let Some(volume) = &report.label_volume {
        let [nx, ny, nz] = volume.dims();
        kv("Label volume", format!("{nx}x{ny}x{nz}"));
    }

    if let Some(acc) = &report.accuracy {
        section("Accuracy");
        kv("Overall", percent(acc.accuracy));
        for tissue in Tissue::ALL {
            kv(&format!("Dice {tissue}"), format!("{:.4}", acc.dice_of(tissue)));
        }
        kv("Confusion (rows = truth)", format!("{:?}", acc.confusion));
    }
}
