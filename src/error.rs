//! Error types for tissuemix operations.
//!
//! Provides rich error context for library consumers: which row holds a
//! non-finite value, which EM iteration and component failed, and the last
//! valid model state when a fit has to be abandoned.

use crate::cluster::Component;
use thiserror::Error;

/// Main error type for tissuemix operations.
///
/// # Examples
///
/// ```
/// use tissuemix::error::TissueMixError;
///
/// let err = TissueMixError::DimensionMismatch {
///     expected: "n_features=8".to_string(),
///     actual: "5".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum TissueMixError {
    /// The dataset is unusable: non-finite values, ragged rows, fewer voxels
    /// than components, mismatched coordinates. Never retried.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input
        reason: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Cholesky factorization hit a non-positive pivot.
    #[error("Matrix is not positive definite (pivot {pivot} <= 0)")]
    NotPositiveDefinite {
        /// Row/column index of the failing pivot
        pivot: usize,
    },

    /// EM could not continue: a covariance stayed singular after
    /// regularization, or the log-likelihood became non-finite.
    #[error("{0}")]
    ConvergenceFailure(Box<ConvergenceDiagnostics>),

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// State captured when an EM fit is abandoned.
#[derive(Debug, Clone)]
pub struct ConvergenceDiagnostics {
    /// 1-based EM iteration that triggered the failure; 0 during
    /// initialization.
    pub iteration: usize,
    /// Component whose covariance could not be factorized, if any.
    pub component: Option<usize>,
    /// Human-readable cause.
    pub reason: String,
    /// Components from the last iteration that completed cleanly.
    pub last_valid: Vec<Component>,
    /// Total log-likelihood per completed iteration.
    pub log_likelihood_trace: Vec<f64>,
}

impl std::fmt::Display for ConvergenceDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.component {
            Some(k) => write!(
                f,
                "Convergence failure at iteration {} (component {k}): {}",
                self.iteration, self.reason
            ),
            None => write!(
                f,
                "Convergence failure at iteration {}: {}",
                self.iteration, self.reason
            ),
        }
    }
}

impl From<serde_json::Error> for TissueMixError {
    fn from(err: serde_json::Error) -> Self {
        TissueMixError::Serialization(err.to_string())
    }
}

impl TissueMixError {
    /// Create an invalid-input error from any message.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an error for a NaN or infinite feature value.
    #[must_use]
    pub fn non_finite(row: usize, col: usize, value: f64) -> Self {
        Self::invalid_input(format!(
            "non-finite value {value} at row {row}, column {col}"
        ))
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::invalid_input(format!("empty input: {context}"))
    }

    /// Returns the diagnostics if this is a convergence failure.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&ConvergenceDiagnostics> {
        match self {
            Self::ConvergenceFailure(diag) => Some(diag.as_ref()),
            _ => None,
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, TissueMixError>;
