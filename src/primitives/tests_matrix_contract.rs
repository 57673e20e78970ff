// =========================================================================
// FALSIFY-MX: Matrix primitives contract
//
// The mixture engine leans on three facts about these primitives:
// transposition is an involution, Cholesky agrees with LU on the
// determinant, and the regularization floor pushes a covariance away from
// singularity.
//
// References:
//   - Golub & Van Loan (2013) "Matrix Computations"
// =========================================================================

use super::*;

/// FALSIFY-MX-001: Transpose involution: (A^T)^T = A
#[test]
fn falsify_mx_001_transpose_involution() {
    let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid");
    let att = a.transpose().transpose();
    assert_eq!(att, a, "FALSIFIED MX-001: (A^T)^T != A");
}

/// FALSIFY-MX-002: Covariance of any row set is symmetric
#[test]
fn falsify_mx_002_covariance_symmetric() {
    let a = Matrix::from_vec(
        5,
        3,
        vec![
            1.0, 0.5, -2.0, 3.0, 1.5, 0.0, -1.0, 2.0, 4.0, 0.0, 0.0, 1.0, 2.5, -0.5, 3.0,
        ],
    )
    .expect("valid");
    let cov = a.covariance();
    assert!(
        cov.is_symmetric(1e-12),
        "FALSIFIED MX-002: covariance not symmetric"
    );
}

/// FALSIFY-MX-003: exp(Cholesky log-det) == LU determinant for SPD input
#[test]
fn falsify_mx_003_cholesky_logdet_matches_lu() {
    let a = Matrix::from_vec(
        3,
        3,
        vec![2.0, 0.3, 0.1, 0.3, 1.5, 0.2, 0.1, 0.2, 1.0],
    )
    .expect("valid");
    let lu = a.determinant().expect("square");
    let chol = a.cholesky().expect("spd").log_determinant().exp();
    assert!(
        (lu - chol).abs() < 1e-10,
        "FALSIFIED MX-003: lu={lu}, cholesky={chol}"
    );
}

/// FALSIFY-MX-004: Adding λI to a PSD matrix strictly increases its determinant
#[test]
fn falsify_mx_004_regularization_increases_determinant() {
    // Rank-deficient PSD: smallest eigenvalue is exactly 0.
    let mut a = Matrix::from_vec(3, 3, vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 2.0])
        .expect("valid");
    let before = a.determinant().expect("square");
    a.add_diagonal(1e-3);
    let after = a.determinant().expect("square");
    assert!(
        after > before,
        "FALSIFIED MX-004: det before={before}, after={after}"
    );
    assert!(
        a.cholesky().is_ok(),
        "FALSIFIED MX-004: regularized matrix not positive definite"
    );
}

/// FALSIFY-MX-005: Singular PSD input is rejected by Cholesky, not silently accepted
#[test]
fn falsify_mx_005_singular_rejected() {
    let a = Matrix::from_vec(2, 2, vec![2.0, 2.0, 2.0, 2.0]).expect("valid");
    assert!(
        a.cholesky().is_err(),
        "FALSIFIED MX-005: singular matrix factorized"
    );
}
