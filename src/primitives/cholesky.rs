//! Cholesky factor of a symmetric positive-definite matrix.
//!
//! The GMM engine evaluates every Gaussian log-density through this factor:
//! `ln|Σ| = 2 Σ ln L_ii` and `(x-μ)ᵀ Σ⁻¹ (x-μ) = ‖L⁻¹(x-μ)‖²`, which avoids
//! forming an explicit inverse or a raw determinant that underflows in
//! higher dimensions.

use super::Matrix;
use crate::error::{Result, TissueMixError};

/// Lower-triangular factor `L` with `A = L Lᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cholesky {
    l: Vec<f64>,
    n: usize,
}

impl Cholesky {
    /// Factorizes `a`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for non-square input and
    /// `NotPositiveDefinite` when a pivot is non-positive or non-finite.
    pub fn new(a: &Matrix<f64>) -> Result<Self> {
        let (rows, cols) = a.shape();
        if rows != cols {
            return Err(TissueMixError::DimensionMismatch {
                expected: "square matrix".to_string(),
                actual: format!("{rows}x{cols}"),
            });
        }

        let n = rows;
        let mut l = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;

                if i == j {
                    for k in 0..j {
                        sum += l[j * n + k] * l[j * n + k];
                    }
                    let diag = a.get(j, j) - sum;
                    if !(diag > 0.0) || !diag.is_finite() {
                        return Err(TissueMixError::NotPositiveDefinite { pivot: j });
                    }
                    l[j * n + j] = diag.sqrt();
                } else {
                    for k in 0..j {
                        sum += l[i * n + k] * l[j * n + k];
                    }
                    l[i * n + j] = (a.get(i, j) - sum) / l[j * n + j];
                }
            }
        }

        Ok(Self { l, n })
    }

    /// Dimension of the factorized matrix.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// `ln |A|`.
    #[must_use]
    pub fn log_determinant(&self) -> f64 {
        2.0 * (0..self.n).map(|i| self.l[i * self.n + i].ln()).sum::<f64>()
    }

    /// Forward substitution: solves `L y = b` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `b` or `out` is shorter than the dimension.
    pub fn solve_lower_into(&self, b: &[f64], out: &mut [f64]) {
        let n = self.n;
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += self.l[i * n + j] * out[j];
            }
            out[i] = (b[i] - sum) / self.l[i * n + i];
        }
    }

    /// Squared Mahalanobis norm `dᵀ A⁻¹ d`, using `scratch` for `L⁻¹ d`.
    ///
    /// # Panics
    ///
    /// Panics if `diff` or `scratch` is shorter than the dimension.
    pub fn mahalanobis_squared(&self, diff: &[f64], scratch: &mut [f64]) -> f64 {
        self.solve_lower_into(diff, scratch);
        scratch[..self.n].iter().map(|v| v * v).sum()
    }

    /// Solves `A x = b`.
    ///
    /// # Panics
    ///
    /// Panics if `b` is shorter than the dimension.
    #[must_use]
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut y = vec![0.0; n];
        self.solve_lower_into(b, &mut y);

        // Backward substitution: Lᵀ x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += self.l[j * n + i] * x[j];
            }
            x[i] = (y[i] - sum) / self.l[i * n + i];
        }
        x
    }

    /// The lower-triangular factor as a matrix.
    #[must_use]
    pub fn lower(&self) -> Matrix<f64> {
        let mut m = Matrix::zeros(self.n, self.n);
        m.as_mut_slice().copy_from_slice(&self.l);
        m
    }
}
