//! Error types for tissuemix-cli

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tissuemix::TissueMixError;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A file that is not valid JSON of the expected shape
    #[error("Invalid format in {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Input data rejected by the library
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// EM could not produce a valid model
    #[error("Fit failed: {0}")]
    ConvergenceFailure(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other library error
    #[error("Segmentation error: {0}")]
    TissueMix(String),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::TissueMix(_) => ExitCode::from(1),
            Self::InvalidConfig(_) => ExitCode::from(2),
            Self::FileNotFound(_) => ExitCode::from(3),
            Self::InvalidFormat { .. } => ExitCode::from(4),
            Self::InvalidInput(_) => ExitCode::from(5),
            Self::ConvergenceFailure(_) => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
        }
    }

    pub(crate) fn invalid_format(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::InvalidFormat {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<TissueMixError> for CliError {
    fn from(e: TissueMixError) -> Self {
        match e {
            TissueMixError::InvalidInput { .. } | TissueMixError::DimensionMismatch { .. } => {
                Self::InvalidInput(e.to_string())
            }
            TissueMixError::InvalidHyperparameter { .. } => Self::InvalidConfig(e.to_string()),
            TissueMixError::ConvergenceFailure(_) | TissueMixError::NotPositiveDefinite { .. } => {
                Self::ConvergenceFailure(e.to_string())
            }
            TissueMixError::Io(io) => Self::Io(io),
            TissueMixError::Serialization(_) => Self::TissueMix(e.to_string()),
        }
    }
}
