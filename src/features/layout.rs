//! Column layout of voxel feature vectors.

use crate::error::{Result, TissueMixError};
use serde::{Deserialize, Serialize};

/// What a feature column holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Normalized voxel intensity.
    Intensity,
    /// Spatial coordinate along the first axis.
    X,
    /// Spatial coordinate along the second axis.
    Y,
    /// Spatial coordinate along the third axis.
    Z,
    /// Intensity variance in a local neighborhood.
    LocalVariance,
    /// Prior probability of cerebrospinal fluid.
    PriorCsf,
    /// Prior probability of gray matter.
    PriorGm,
    /// Prior probability of white matter.
    PriorWm,
    /// Any other column; carried through the fit, ignored by the mapper.
    Custom(String),
}

impl FeatureKind {
    /// Parses a column name. Unknown names become [`FeatureKind::Custom`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "intensity" => Self::Intensity,
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,
            "local_variance" | "variance" => Self::LocalVariance,
            "prior_csf" => Self::PriorCsf,
            "prior_gm" => Self::PriorGm,
            "prior_wm" => Self::PriorWm,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Canonical column name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Intensity => "intensity",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::LocalVariance => "local_variance",
            Self::PriorCsf => "prior_csf",
            Self::PriorGm => "prior_gm",
            Self::PriorWm => "prior_wm",
            Self::Custom(name) => name,
        }
    }
}

/// Fixed-dimension description of a feature vector.
///
/// D is the number of columns. Exactly one column is the intensity; the three
/// prior columns are either all present or all absent.
///
/// # Examples
///
/// ```
/// use tissuemix::features::FeatureLayout;
///
/// let layout = FeatureLayout::standard();
/// assert_eq!(layout.dim(), 8);
/// assert_eq!(layout.intensity_index(), 0);
/// assert_eq!(layout.prior_indices(), Some([5, 6, 7]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureKind>", into = "Vec<FeatureKind>")]
pub struct FeatureLayout {
    columns: Vec<FeatureKind>,
    intensity: usize,
    priors: Option<[usize; 3]>,
}

impl FeatureLayout {
    /// Builds a layout from column kinds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if there is no intensity column, a named kind
    /// repeats, or only some of the three prior columns are present.
    pub fn new(columns: Vec<FeatureKind>) -> Result<Self> {
        for (i, kind) in columns.iter().enumerate() {
            if columns[..i].contains(kind) {
                return Err(TissueMixError::invalid_input(format!(
                    "duplicate feature column '{}'",
                    kind.name()
                )));
            }
        }

        let position = |kind: &FeatureKind| columns.iter().position(|c| c == kind);

        let intensity = position(&FeatureKind::Intensity).ok_or_else(|| {
            TissueMixError::invalid_input("feature layout has no 'intensity' column")
        })?;

        let priors = match (
            position(&FeatureKind::PriorCsf),
            position(&FeatureKind::PriorGm),
            position(&FeatureKind::PriorWm),
        ) {
            (Some(c), Some(g), Some(w)) => Some([c, g, w]),
            (None, None, None) => None,
            _ => {
                return Err(TissueMixError::invalid_input(
                    "prior columns must be all present (prior_csf, prior_gm, prior_wm) or all absent",
                ))
            }
        };

        Ok(Self {
            columns,
            intensity,
            priors,
        })
    }

    /// Builds a layout from column names.
    ///
    /// # Errors
    ///
    /// Same as [`FeatureLayout::new`].
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::new(
            names
                .iter()
                .map(|n| FeatureKind::from_name(n.as_ref()))
                .collect(),
        )
    }

    /// Layout whose intensity and prior positions are already known to be
    /// consistent with `columns`.
    pub(crate) fn from_parts(
        columns: Vec<FeatureKind>,
        intensity: usize,
        priors: Option<[usize; 3]>,
    ) -> Self {
        debug_assert_eq!(columns.get(intensity), Some(&FeatureKind::Intensity));
        Self {
            columns,
            intensity,
            priors,
        }
    }

    /// `intensity, x, y, z, local_variance, prior_csf, prior_gm, prior_wm`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            columns: vec![
                FeatureKind::Intensity,
                FeatureKind::X,
                FeatureKind::Y,
                FeatureKind::Z,
                FeatureKind::LocalVariance,
                FeatureKind::PriorCsf,
                FeatureKind::PriorGm,
                FeatureKind::PriorWm,
            ],
            intensity: 0,
            priors: Some([5, 6, 7]),
        }
    }

    /// D anonymous columns; column 0 is treated as the intensity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for `dim == 0`, since every layout needs an
    /// intensity column.
    pub fn generic(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(TissueMixError::invalid_input(
                "feature layout needs at least one column",
            ));
        }
        let columns = (0..dim)
            .map(|i| {
                if i == 0 {
                    FeatureKind::Intensity
                } else {
                    FeatureKind::Custom(format!("f{i}"))
                }
            })
            .collect();
        Ok(Self {
            columns,
            intensity: 0,
            priors: None,
        })
    }

    /// Number of features per voxel (D).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    /// Column kinds in order.
    #[must_use]
    pub fn columns(&self) -> &[FeatureKind] {
        &self.columns
    }

    /// Column index of the intensity feature.
    #[must_use]
    pub fn intensity_index(&self) -> usize {
        self.intensity
    }

    /// Column indices of the CSF, GM and WM priors, if present.
    #[must_use]
    pub fn prior_indices(&self) -> Option<[usize; 3]> {
        self.priors
    }
}

impl TryFrom<Vec<FeatureKind>> for FeatureLayout {
    type Error = TissueMixError;

    fn try_from(columns: Vec<FeatureKind>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<FeatureLayout> for Vec<FeatureKind> {
    fn from(layout: FeatureLayout) -> Self {
        layout.columns
    }
}
