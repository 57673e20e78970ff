//! CLI Integration Tests for tissuemix-cli

#![allow(clippy::unwrap_used)] // Tests can use unwrap

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a tissuemix command
fn tissuemix() -> Command {
    Command::cargo_bin("tissuemix").expect("Failed to find tissuemix binary")
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Feature rows on a 3x4x5 grid: one tissue per i-slab, intensity and
/// matching prior per tissue. Returns (features JSON, ground truth JSON).
fn tissue_features() -> (String, String) {
    let mut rows = Vec::new();
    let mut coords = Vec::new();
    let mut truth = Vec::new();
    for i in 0..3 {
        for j in 0..4 {
            for k in 0..5 {
                let base = [0.2, 0.5, 0.8][i];
                let wiggle = 0.01 * ((j * 5 + k) as f64 / 20.0 - 0.5);
                let mut prior = [0.1, 0.1, 0.1];
                prior[i] = 0.8;
                prior[(i + 1) % 3] += 0.002 * k as f64;
                rows.push(format!(
                    "[{}, {}, {}, {}]",
                    base + wiggle,
                    prior[0],
                    prior[1],
                    prior[2]
                ));
                coords.push(format!("[{i}, {j}, {k}]"));
                truth.push(format!("[{}, {}, {}]", prior[0], prior[1], prior[2]));
            }
        }
    }
    let features = format!(
        r#"{{"columns": ["intensity", "prior_csf", "prior_gm", "prior_wm"], "rows": [{}], "coords": [{}]}}"#,
        rows.join(", "),
        coords.join(", ")
    );
    (features, format!("[{}]", truth.join(", ")))
}

// ============================================================================
// segment
// ============================================================================

#[test]
fn test_segment_prints_summary() {
    let (features, _) = tissue_features();
    let file = write_temp(&features);

    tissuemix()
        .args(["segment", "--features", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tissue mapping"))
        .stdout(predicate::str::contains("Label map"))
        .stdout(predicate::str::contains("20 voxels"));
}

#[test]
fn test_segment_writes_report_and_inspect_reads_it() {
    let (features, truth) = tissue_features();
    let features_file = write_temp(&features);
    let truth_file = write_temp(&truth);
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.json");

    tissuemix()
        .args([
            "segment",
            "--features",
            features_file.path().to_str().unwrap(),
            "--dims",
            "3,4,5",
            "--ground-truth",
            truth_file.path().to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accuracy"));

    let text = std::fs::read_to_string(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["labels"].as_array().unwrap().len(), 60);
    assert_eq!(value["labels"][0], "CSF");
    assert_eq!(value["labels"][59], "WM");
    assert!(value["mapping"]["map"]["0"].is_string());
    assert_eq!(value["accuracy"]["accuracy"], 1.0);
    assert_eq!(value["label_volume"]["dims"], serde_json::json!([3, 4, 5]));

    tissuemix()
        .args(["inspect", report.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"n_voxels\": 60"))
        .stdout(predicate::str::contains("\"tissue_counts\""));

    tissuemix()
        .args(["inspect", report.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report"));
}

#[test]
fn test_segment_json_output_is_valid_json() {
    let (features, _) = tissue_features();
    let file = write_temp(&features);

    let output = tissuemix()
        .args(["segment", "--features", file.path().to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["model"]["components"].is_array());
    assert_eq!(value["mapping"]["basis"], "overlap");
}

#[test]
fn test_segment_with_config_file() {
    let (features, _) = tissue_features();
    let features_file = write_temp(&features);
    let config = write_temp(r#"{"gmm": {"seed": 3, "max_iterations": 200}}"#);

    tissuemix()
        .args([
            "segment",
            "--features",
            features_file.path().to_str().unwrap(),
            "--config",
            config.path().to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn test_verbose_logs_to_stderr() {
    let (features, _) = tissue_features();
    let file = write_temp(&features);

    tissuemix()
        .args(["-vv", "segment", "--features", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("EM iteration"));
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_missing_features_file() {
    tissuemix()
        .args(["segment", "--features", "/nonexistent/features.json"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_malformed_features_file() {
    let file = write_temp("{not json");

    tissuemix()
        .args(["segment", "--features", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_non_three_components_rejected() {
    let (features, _) = tissue_features();
    let features_file = write_temp(&features);
    let config = write_temp(r#"{"gmm": {"n_components": 2}}"#);

    tissuemix()
        .args([
            "segment",
            "--features",
            features_file.path().to_str().unwrap(),
            "--config",
            config.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("n_components"));
}

#[test]
fn test_features_without_priors_rejected() {
    let file = write_temp(r#"{"columns": ["intensity"], "rows": [[0.1], [0.5], [0.9], [0.2]]}"#);

    tissuemix()
        .args(["segment", "--features", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("prior"));
}

#[test]
fn test_out_of_bounds_coordinates_rejected() {
    let (features, _) = tissue_features();
    let file = write_temp(&features);

    tissuemix()
        .args([
            "segment",
            "--features",
            file.path().to_str().unwrap(),
            "--dims",
            "2,4,5",
        ])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("outside volume"));
}

#[test]
fn test_inspect_missing_report() {
    tissuemix()
        .args(["inspect", "/nonexistent/report.json"])
        .assert()
        .failure()
        .code(3);
}
