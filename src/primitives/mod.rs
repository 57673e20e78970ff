//! Core compute primitives (Matrix, Cholesky).
//!
//! These types provide the dense linear algebra the mixture engine needs:
//! row-major storage, covariance estimation, determinants and Cholesky
//! factorization.

mod cholesky;
mod matrix;

pub use cholesky::Cholesky;
pub use matrix::Matrix;
