//! Anatomical tissue classes and the cluster-to-tissue mapping.

mod mapper;

pub use mapper::{ClusterMapper, MappingAmbiguity, MappingBasis, MappingOutcome};

use crate::error::{Result, TissueMixError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Brain tissue class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tissue {
    /// Cerebrospinal fluid.
    #[serde(rename = "CSF")]
    Csf,
    /// Gray matter.
    #[serde(rename = "GM")]
    Gm,
    /// White matter.
    #[serde(rename = "WM")]
    Wm,
}

impl Tissue {
    /// All classes in prior-column order.
    pub const ALL: [Tissue; 3] = [Tissue::Csf, Tissue::Gm, Tissue::Wm];

    /// Position in [`Tissue::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Tissue::Csf => 0,
            Tissue::Gm => 1,
            Tissue::Wm => 2,
        }
    }

    /// Label-volume code; 0 is reserved for background.
    #[must_use]
    pub fn code(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Short name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tissue::Csf => "CSF",
            Tissue::Gm => "GM",
            Tissue::Wm => "WM",
        }
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bijection from the three mixture components to the three tissues.
///
/// Serializes as key → value pairs, e.g. `{"0": "WM", "1": "CSF", "2": "GM"}`.
///
/// # Examples
///
/// ```
/// use tissuemix::tissue::{ClusterLabelMap, Tissue};
///
/// let map = ClusterLabelMap::new([Tissue::Wm, Tissue::Csf, Tissue::Gm]).unwrap();
/// assert_eq!(map.tissue_of(0), Some(Tissue::Wm));
/// assert_eq!(map.component_of(Tissue::Gm), 2);
/// assert_eq!(map.apply(&[1, 0]).unwrap(), vec![Tissue::Csf, Tissue::Wm]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<usize, Tissue>", into = "BTreeMap<usize, Tissue>")]
pub struct ClusterLabelMap {
    tissues: [Tissue; 3],
}

impl ClusterLabelMap {
    /// Builds a map where component `c` is labeled `tissues[c]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a tissue appears twice.
    pub fn new(tissues: [Tissue; 3]) -> Result<Self> {
        for t in Tissue::ALL {
            if !tissues.contains(&t) {
                return Err(TissueMixError::invalid_input(format!(
                    "cluster label map is not a bijection: {t} is unassigned"
                )));
            }
        }
        Ok(Self { tissues })
    }

    /// Map from a permutation of tissue indices. Callers guarantee a permutation.
    pub(crate) fn from_permutation(perm: [usize; 3]) -> Self {
        Self {
            tissues: perm.map(|t| Tissue::ALL[t]),
        }
    }

    /// Tissue of component `component`, `None` past the third component.
    #[must_use]
    pub fn tissue_of(&self, component: usize) -> Option<Tissue> {
        self.tissues.get(component).copied()
    }

    /// Component labeled `tissue`.
    #[must_use]
    pub fn component_of(&self, tissue: Tissue) -> usize {
        self.tissues
            .iter()
            .position(|&t| t == tissue)
            .unwrap_or_default()
    }

    /// Tissues in component order.
    #[must_use]
    pub fn tissues(&self) -> [Tissue; 3] {
        self.tissues
    }

    /// Translates cluster indices into tissues.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an index outside `0..3`.
    pub fn apply(&self, labels: &[usize]) -> Result<Vec<Tissue>> {
        labels
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                self.tissue_of(c).ok_or_else(|| {
                    TissueMixError::invalid_input(format!(
                        "voxel {i} has cluster index {c}, expected 0..3"
                    ))
                })
            })
            .collect()
    }
}

impl fmt::Display for ClusterLabelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tissues
            .iter()
            .enumerate()
            .map(|(c, t)| format!("{c}→{t}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl TryFrom<BTreeMap<usize, Tissue>> for ClusterLabelMap {
    type Error = TissueMixError;

    fn try_from(map: BTreeMap<usize, Tissue>) -> Result<Self> {
        if map.len() != 3 || map.keys().copied().ne(0..3) {
            return Err(TissueMixError::invalid_input(
                "cluster label map must have exactly the keys 0, 1 and 2",
            ));
        }
        let values: Vec<Tissue> = map.into_values().collect();
        Self::new([values[0], values[1], values[2]])
    }
}

impl From<ClusterLabelMap> for BTreeMap<usize, Tissue> {
    fn from(map: ClusterLabelMap) -> Self {
        map.tissues.into_iter().enumerate().collect()
    }
}
