//! Run configuration.
//!
//! Every option has a default, so an empty JSON object is a valid config
//! file. Values are validated once, before any fitting starts.

use crate::error::{Result, TissueMixError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How initial component means are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    /// Centroids of a seeded k-means run.
    #[default]
    KMeans,
    /// K distinct voxels drawn with the seed.
    RandomSamples,
}

/// Options of the Gaussian mixture fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GmmConfig {
    /// Mixture component count (K).
    pub n_components: usize,
    /// EM iteration budget; reaching it is a normal termination.
    pub max_iterations: usize,
    /// Stop when the total log-likelihood changes by less than this.
    pub tolerance: f64,
    /// Seed for reproducible initialization.
    pub seed: u64,
    /// Added to every covariance diagonal after each M-step.
    pub covariance_regularization: f64,
    /// Initialization strategy.
    pub init: InitMethod,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            n_components: 3,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
            covariance_regularization: 1e-6,
            init: InitMethod::KMeans,
        }
    }
}

impl GmmConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(invalid("n_components", self.n_components, ">= 1"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", self.max_iterations, ">= 1"));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(invalid("tolerance", self.tolerance, "finite and >= 0"));
        }
        if !(self.covariance_regularization > 0.0 && self.covariance_regularization.is_finite()) {
            return Err(invalid(
                "covariance_regularization",
                self.covariance_regularization,
                "finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Options of the cluster-to-tissue mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    /// If the best and second-best bijections score within this margin,
    /// fall back to intensity ordering.
    pub ambiguity_margin: f64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            ambiguity_margin: 1e-3,
        }
    }
}

impl MappingConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for a negative or non-finite margin.
    pub fn validate(&self) -> Result<()> {
        if !(self.ambiguity_margin >= 0.0 && self.ambiguity_margin.is_finite()) {
            return Err(invalid(
                "ambiguity_margin",
                self.ambiguity_margin,
                "finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Complete configuration of a segmentation run.
///
/// # Examples
///
/// ```
/// use tissuemix::config::SegmentationConfig;
///
/// let cfg: SegmentationConfig = serde_json::from_str(r#"{"gmm": {"seed": 7}}"#).unwrap();
/// assert_eq!(cfg.gmm.seed, 7);
/// assert_eq!(cfg.gmm.n_components, 3);
/// cfg.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmentationConfig {
    /// Mixture fit options.
    pub gmm: GmmConfig,
    /// Label mapping options.
    pub mapping: MappingConfig,
}

impl SegmentationConfig {
    /// Loads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `Io`, `Serialization` or `InvalidHyperparameter`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        self.gmm.validate()?;
        self.mapping.validate()
    }
}

fn invalid(param: &str, value: impl std::fmt::Display, constraint: &str) -> TissueMixError {
    TissueMixError::InvalidHyperparameter {
        param: param.to_string(),
        value: value.to_string(),
        constraint: constraint.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SegmentationConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.gmm.n_components, 3);
        assert_eq!(cfg.gmm.init, InitMethod::KMeans);
    }

    #[test]
    fn test_rejects_zero_components() {
        let cfg = GmmConfig {
            n_components: 0,
            ..GmmConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("n_components"));
    }

    #[test]
    fn test_rejects_non_positive_regularization() {
        let cfg = GmmConfig {
            covariance_regularization: 0.0,
            ..GmmConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_tolerance() {
        let cfg = GmmConfig {
            tolerance: f64::NAN,
            ..GmmConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_margin() {
        let cfg = MappingConfig {
            ambiguity_margin: -1.0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_init_method_snake_case() {
        let cfg: GmmConfig = serde_json::from_str(r#"{"init": "random_samples"}"#).expect("parse");
        assert_eq!(cfg.init, InitMethod::RandomSamples);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: std::result::Result<GmmConfig, _> = serde_json::from_str(r#"{"n_comps": 3}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"gmm": {{"max_iterations": 20, "covariance_regularization": 1e-4}}, "mapping": {{"ambiguity_margin": 0.05}}}}"#
        )
        .expect("write");
        let cfg = SegmentationConfig::from_json_file(file.path()).expect("load");
        assert_eq!(cfg.gmm.max_iterations, 20);
        assert!((cfg.mapping.ambiguity_margin - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_from_json_file_validates() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"gmm": {{"max_iterations": 0}}}}"#).expect("write");
        let err = SegmentationConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, TissueMixError::InvalidHyperparameter { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SegmentationConfig::from_json_file("/nonexistent/tissuemix.json").unwrap_err();
        assert!(matches!(err, TissueMixError::Io(_)));
    }
}
