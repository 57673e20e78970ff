// =========================================================================
// FALSIFY-GM: Gaussian Mixture Model contract (tissuemix cluster)
//
// Each test tries to break one property every fitted mixture must hold,
// whatever the data or seed.
//
// References:
//   - Dempster, Laird, Rubin (1977) "Maximum Likelihood from Incomplete Data via the EM Algorithm"
// =========================================================================

use super::*;
use crate::error::TissueMixError;
use crate::features::Dataset;
use crate::primitives::Matrix;
use crate::traits::{ClusterModel, SoftClusterModel, UnsupervisedEstimator};

fn two_groups() -> Dataset {
    Dataset::from_features(
        Matrix::from_vec(
            8,
            2,
            vec![
                0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 0.0, 0.2, //
                5.0, 5.0, 5.1, 5.1, 5.2, 5.0, 5.0, 5.2,
            ],
        )
        .expect("valid matrix"),
    )
    .expect("finite")
}

/// Ten scattered points on a line plus noise; too few for five components
/// to be estimated well.
fn ten_points() -> Dataset {
    let values: Vec<f64> = (0..10)
        .flat_map(|i| {
            let t = f64::from(i);
            [t, 0.5 * t + (t * 1.3).sin()]
        })
        .collect();
    Dataset::from_features(Matrix::from_vec(10, 2, values).expect("valid matrix")).expect("finite")
}

/// FALSIFY-GM-001: Mixing weights sum to 1.0
#[test]
fn falsify_gm_001_weights_sum_to_one() {
    let model = GaussianMixture::new(2)
        .with_random_state(42)
        .with_max_iter(50)
        .fit(&two_groups())
        .expect("fit succeeds");

    let sum: f64 = model.weights().iter().sum();
    assert!(
        (sum - 1.0).abs() < 1e-6,
        "FALSIFIED GM-001: weights sum={sum}, expected 1.0"
    );
    assert!(
        model.weights().iter().all(|&w| w >= 0.0),
        "FALSIFIED GM-001: negative weight"
    );
}

/// FALSIFY-GM-002: Every responsibility row sums to 1.0
#[test]
fn falsify_gm_002_responsibility_rows_sum_to_one() {
    let data = two_groups();
    let model = GaussianMixture::new(3).fit(&data).expect("fit succeeds");
    let proba = model.predict_proba(&data).expect("same dim");

    for (i, row) in proba.rows().enumerate() {
        let sum: f64 = row.iter().sum();
        assert!(
            (sum - 1.0).abs() < 1e-6,
            "FALSIFIED GM-002: row {i} sums to {sum}"
        );
        assert!(
            row.iter().all(|p| (0.0..=1.0).contains(p)),
            "FALSIFIED GM-002: row {i} has a probability outside [0, 1]"
        );
    }
}

/// FALSIFY-GM-003: Hard labels are exactly the arg-max of responsibilities
#[test]
fn falsify_gm_003_predict_is_argmax_of_proba() {
    let data = ten_points();
    let model = GaussianMixture::new(3)
        .with_random_state(11)
        .fit(&data)
        .expect("fit succeeds");
    let labels = model.predict(&data).expect("same dim");
    let proba = model.predict_proba(&data).expect("same dim");

    assert_eq!(labels.len(), 10, "FALSIFIED GM-003: wrong label count");
    for (i, &label) in labels.iter().enumerate() {
        let row = proba.row(i);
        assert!(
            row.iter().all(|&p| p <= row[label]),
            "FALSIFIED GM-003: label {label} of voxel {i} is not the arg-max"
        );
    }
}

/// FALSIFY-GM-004: The log-likelihood trace never decreases
#[test]
fn falsify_gm_004_log_likelihood_monotone() {
    let model = GaussianMixture::new(2)
        .with_tol(0.0)
        .with_max_iter(30)
        .fit(&ten_points())
        .expect("fit succeeds");

    let trace = &model.report().log_likelihood_trace;
    assert!(!trace.is_empty(), "FALSIFIED GM-004: empty trace");
    for pair in trace.windows(2) {
        assert!(
            pair[1] >= pair[0] - 1e-6 * pair[0].abs().max(1.0),
            "FALSIFIED GM-004: log-likelihood fell from {} to {}",
            pair[0],
            pair[1]
        );
    }
}

/// FALSIFY-GM-005: Covariances stay positive definite even when K is large
/// relative to N
#[test]
fn falsify_gm_005_covariances_stay_spd() {
    let model = GaussianMixture::new(5)
        .with_reg_covar(1e-6)
        .fit(&ten_points())
        .expect("regularization keeps the fit alive");

    for (k, c) in model.components().iter().enumerate() {
        assert!(
            c.covariance.cholesky().is_ok(),
            "FALSIFIED GM-005: component {k} covariance is not SPD"
        );
        assert!(
            c.covariance.determinant().expect("square") > 0.0,
            "FALSIFIED GM-005: component {k} has non-positive determinant"
        );
        assert!(
            c.covariance.is_symmetric(1e-12),
            "FALSIFIED GM-005: component {k} covariance is not symmetric"
        );
    }
}

/// FALSIFY-GM-006: Fewer voxels than components is rejected, not fitted
#[test]
fn falsify_gm_006_fewer_samples_than_components() {
    let data = Dataset::from_features(Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("2x1"))
        .expect("finite");
    let err = GaussianMixture::new(3).fit(&data).unwrap_err();
    assert!(
        matches!(err, TissueMixError::InvalidInput { .. }),
        "FALSIFIED GM-006: expected InvalidInput, got {err:?}"
    );
}

/// FALSIFY-GM-007: Same seed, same data, same model
#[test]
fn falsify_gm_007_reproducible() {
    let data = ten_points();
    let a = GaussianMixture::new(3).with_random_state(5).fit(&data).expect("fit");
    let b = GaussianMixture::new(3).with_random_state(5).fit(&data).expect("fit");
    assert_eq!(
        a.components(),
        b.components(),
        "FALSIFIED GM-007: identical runs disagree"
    );
    assert_eq!(a.report(), b.report());
}

/// FALSIFY-GM-008: A non-finite log-likelihood aborts with diagnostics
#[test]
fn falsify_gm_008_failure_carries_diagnostics() {
    // Values this large overflow the squared deviations to infinity.
    let data = Dataset::from_features(
        Matrix::from_vec(4, 1, vec![-1e300, -1e300, 1e300, 1e300]).expect("4x1"),
    )
    .expect("finite");
    let err = GaussianMixture::new(2).fit(&data).unwrap_err();

    let diag = err
        .diagnostics()
        .expect("FALSIFIED GM-008: failure without diagnostics");
    assert_eq!(diag.last_valid.len(), 2, "FALSIFIED GM-008: last state lost");
    assert!(!diag.reason.is_empty());
}

/// FALSIFY-GM-009: Convergence is reported only after at least two
/// log-likelihood evaluations
#[test]
fn falsify_gm_009_convergence_needs_two_evaluations() {
    let model = GaussianMixture::new(2)
        .with_tol(1e12)
        .fit(&two_groups())
        .expect("fit succeeds");
    assert!(model.report().converged);
    assert_eq!(
        model.report().n_iter,
        2,
        "FALSIFIED GM-009: converged after {} iterations",
        model.report().n_iter
    );
}

/// FALSIFY-GM-010: Zero-width data is an input error, never a panic
#[test]
fn falsify_gm_010_zero_width_data_rejected() {
    let result =
        Dataset::from_features(Matrix::zeros(5, 0)).and_then(|data| GaussianMixture::new(3).fit(&data));
    assert!(
        matches!(result, Err(TissueMixError::InvalidInput { .. })),
        "FALSIFIED GM-010: zero-width data accepted"
    );
}
