//! Reference feature extraction from intensity volumes.
//!
//! Produces the standard feature set per in-mask voxel: min-max normalized
//! intensity, normalized spatial coordinates, local intensity variance and
//! the three tissue priors. Voxels are emitted in storage (i-major) order.

use super::{Dataset, FeatureKind, FeatureLayout, VoxelCoord};
use crate::error::{Result, TissueMixError};
use crate::primitives::Matrix;
use crate::volume::Volume;

/// CSF, GM and WM prior-probability maps on the image grid.
#[derive(Debug, Clone)]
pub struct PriorMaps {
    /// Cerebrospinal fluid prior.
    pub csf: Volume<f32>,
    /// Gray matter prior.
    pub gm: Volume<f32>,
    /// White matter prior.
    pub wm: Volume<f32>,
}

impl PriorMaps {
    fn check_dims(&self, dims: [usize; 3]) -> Result<()> {
        for (name, map) in [("csf", &self.csf), ("gm", &self.gm), ("wm", &self.wm)] {
            if map.dims() != dims {
                return Err(TissueMixError::invalid_input(format!(
                    "{name} prior has dims {:?}, image has {dims:?}",
                    map.dims()
                )));
            }
        }
        Ok(())
    }
}

/// Builds a [`Dataset`] from an image, a brain mask and optional priors.
///
/// # Examples
///
/// ```
/// use tissuemix::features::FeatureBuilder;
/// use tissuemix::volume::Volume;
///
/// let image = Volume::new([2, 2, 1], vec![10.0f32, 20.0, 30.0, 40.0]).unwrap();
/// let mask = image.threshold_mask(15.0);
/// let data = FeatureBuilder::new().build(&image, &mask, None).unwrap();
/// assert_eq!(data.n_samples(), 3);
/// assert_eq!(data.n_features(), 5); // intensity, x, y, z, local_variance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureBuilder {
    coordinates: bool,
    variance_radius: Option<usize>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    /// Coordinates on, local variance over a 3×3×3 neighborhood.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coordinates: true,
            variance_radius: Some(1),
        }
    }

    /// Include or drop the x/y/z columns.
    #[must_use]
    pub fn with_coordinates(mut self, enabled: bool) -> Self {
        self.coordinates = enabled;
        self
    }

    /// Neighborhood radius for local variance; `None` drops the column.
    #[must_use]
    pub fn with_variance_radius(mut self, radius: Option<usize>) -> Self {
        self.variance_radius = radius;
        self
    }

    /// Layout produced by this builder.
    #[must_use]
    pub fn layout(&self, with_priors: bool) -> FeatureLayout {
        let mut columns = vec![FeatureKind::Intensity];
        if self.coordinates {
            columns.extend([FeatureKind::X, FeatureKind::Y, FeatureKind::Z]);
        }
        if self.variance_radius.is_some() {
            columns.push(FeatureKind::LocalVariance);
        }
        let priors = with_priors.then(|| {
            let first = columns.len();
            columns.extend([
                FeatureKind::PriorCsf,
                FeatureKind::PriorGm,
                FeatureKind::PriorWm,
            ]);
            [first, first + 1, first + 2]
        });
        FeatureLayout::from_parts(columns, 0, priors)
    }

    /// Extracts features for every voxel where `mask` is true.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the mask or priors do not match the image
    /// grid, when the mask is empty, or when the image holds non-finite
    /// values inside the mask.
    pub fn build(
        &self,
        image: &Volume<f32>,
        mask: &Volume<bool>,
        priors: Option<&PriorMaps>,
    ) -> Result<Dataset> {
        let dims = image.dims();
        if mask.dims() != dims {
            return Err(TissueMixError::invalid_input(format!(
                "mask has dims {:?}, image has {dims:?}",
                mask.dims()
            )));
        }
        if let Some(p) = priors {
            p.check_dims(dims)?;
        }

        let coords: Vec<VoxelCoord> = image
            .coords()
            .filter(|c| mask.as_slice()[image.index(c.i, c.j, c.k)])
            .collect();
        if coords.is_empty() {
            return Err(TissueMixError::empty_input("brain mask selects no voxels"));
        }

        let normalized = normalize_in_mask(image, mask);
        let layout = self.layout(priors.is_some());
        let d = layout.dim();
        let axis_scale = dims.map(|n| if n > 1 { (n - 1) as f64 } else { 1.0 });

        let mut data = Vec::with_capacity(coords.len() * d);
        for c in &coords {
            let idx = image.index(c.i, c.j, c.k);
            let value = normalized[idx];
            if !value.is_finite() {
                return Err(TissueMixError::non_finite(data.len() / d, 0, value));
            }
            data.push(value);
            if self.coordinates {
                data.push(c.i as f64 / axis_scale[0]);
                data.push(c.j as f64 / axis_scale[1]);
                data.push(c.k as f64 / axis_scale[2]);
            }
            if let Some(radius) = self.variance_radius {
                data.push(local_variance(&normalized, mask, *c, radius));
            }
            if let Some(p) = priors {
                data.push(f64::from(p.csf.as_slice()[idx]));
                data.push(f64::from(p.gm.as_slice()[idx]));
                data.push(f64::from(p.wm.as_slice()[idx]));
            }
        }

        Dataset::new(Matrix::from_vec(coords.len(), d, data)?, coords, layout)
    }
}

/// Min-max normalization over in-mask voxels; out-of-mask voxels become 0.
fn normalize_in_mask(image: &Volume<f32>, mask: &Volume<bool>) -> Vec<f64> {
    let in_mask = || {
        image
            .as_slice()
            .iter()
            .zip(mask.as_slice())
            .filter(|(_, m)| **m)
            .map(|(&v, _)| f64::from(v))
    };
    let min = in_mask().fold(f64::INFINITY, f64::min);
    let max = in_mask().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    image
        .as_slice()
        .iter()
        .zip(mask.as_slice())
        .map(|(&v, &m)| match (m, range > 0.0) {
            (true, true) => (f64::from(v) - min) / range,
            _ => 0.0,
        })
        .collect()
}

/// Population variance of in-mask neighbors within a cube of `radius`.
fn local_variance(values: &[f64], mask: &Volume<bool>, c: VoxelCoord, radius: usize) -> f64 {
    let [nx, ny, nz] = mask.dims();
    let span = |center: usize, n: usize| center.saturating_sub(radius)..=(center + radius).min(n - 1);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for i in span(c.i, nx) {
        for j in span(c.j, ny) {
            for k in span(c.k, nz) {
                let idx = mask.index(i, j, k);
                if mask.as_slice()[idx] {
                    let v = values[idx];
                    sum += v;
                    sum_sq += v * v;
                    count += 1;
                }
            }
        }
    }
    if count < 2 {
        return 0.0;
    }
    let mean = sum / count as f64;
    (sum_sq / count as f64 - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_image() -> Volume<f32> {
        Volume::new([3, 3, 3], (0..27).map(|v| v as f32).collect()).expect("27 voxels")
    }

    #[test]
    fn test_full_mask_standard_layout() {
        let image = ramp_image();
        let mask = Volume::filled([3, 3, 3], true);
        let priors = PriorMaps {
            csf: Volume::filled([3, 3, 3], 0.2),
            gm: Volume::filled([3, 3, 3], 0.3),
            wm: Volume::filled([3, 3, 3], 0.5),
        };
        let data = FeatureBuilder::new()
            .build(&image, &mask, Some(&priors))
            .expect("valid inputs");
        assert_eq!(data.n_samples(), 27);
        assert_eq!(data.layout(), &FeatureLayout::standard());

        // First voxel: lowest intensity, origin.
        let first = data.row(0);
        assert!(first[0].abs() < 1e-12);
        assert!(first[1].abs() < 1e-12);
        // Last voxel: highest intensity, far corner.
        let last = data.row(26);
        assert!((last[0] - 1.0).abs() < 1e-12);
        assert!((last[1] - 1.0).abs() < 1e-12);
        assert!((last[3] - 1.0).abs() < 1e-12);
        assert!((last[7] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mask_selects_voxels_in_order() {
        let image = ramp_image();
        let mask = image.threshold_mask(20.5);
        let data = FeatureBuilder::new()
            .with_coordinates(false)
            .with_variance_radius(None)
            .build(&image, &mask, None)
            .expect("valid inputs");
        assert_eq!(data.n_samples(), 6);
        assert_eq!(data.n_features(), 1);
        let ints = data.intensities();
        assert!(ints.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(data.coords()[0], VoxelCoord::new(2, 1, 0));
    }

    #[test]
    fn test_constant_region_has_zero_variance() {
        let image = Volume::filled([3, 3, 3], 5.0f32);
        let mask = Volume::filled([3, 3, 3], true);
        let data = FeatureBuilder::new().build(&image, &mask, None).expect("valid");
        for i in 0..data.n_samples() {
            assert!(data.row(i)[4].abs() < 1e-12);
            assert!(data.row(i)[0].abs() < 1e-12);
        }
    }

    #[test]
    fn test_local_variance_positive_on_ramp() {
        let image = ramp_image();
        let mask = Volume::filled([3, 3, 3], true);
        let data = FeatureBuilder::new().build(&image, &mask, None).expect("valid");
        let center = data.row(13);
        assert!(center[4] > 0.0);
    }

    #[test]
    fn test_empty_mask_rejected() {
        let image = ramp_image();
        let mask = Volume::filled([3, 3, 3], false);
        let err = FeatureBuilder::new().build(&image, &mask, None).unwrap_err();
        assert!(err.to_string().contains("empty input"));
    }

    #[test]
    fn test_mismatched_prior_dims_rejected() {
        let image = ramp_image();
        let mask = Volume::filled([3, 3, 3], true);
        let priors = PriorMaps {
            csf: Volume::filled([3, 3, 2], 0.2),
            gm: Volume::filled([3, 3, 3], 0.3),
            wm: Volume::filled([3, 3, 3], 0.5),
        };
        let err = FeatureBuilder::new()
            .build(&image, &mask, Some(&priors))
            .unwrap_err();
        assert!(err.to_string().contains("csf"));
    }

    #[test]
    fn test_non_finite_in_mask_rejected() {
        let mut data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        data[3] = f32::NAN;
        let image = Volume::new([2, 2, 2], data).expect("8 voxels");
        let mask = Volume::filled([2, 2, 2], true);
        assert!(FeatureBuilder::new().build(&image, &mask, None).is_err());
    }
}
