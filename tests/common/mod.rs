//! Shared synthetic data for integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tissuemix::features::{FeatureLayout, VoxelCoord};
use tissuemix::prelude::*;

/// Standard normal sample via the Box-Muller transform.
pub fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `per_blob` isotropic unit-variance points around each center, blob by blob.
pub fn blobs(centers: &[Vec<f64>], per_blob: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(centers.len() * per_blob);
    for center in centers {
        for _ in 0..per_blob {
            rows.push(
                center
                    .iter()
                    .map(|&c| c + standard_normal(&mut rng))
                    .collect::<Vec<f64>>(),
            );
        }
    }
    Dataset::from_features(Matrix::from_rows(&rows).expect("rectangular")).expect("finite")
}

/// Three tissue-like groups in a 4-column layout (intensity + three priors).
///
/// Group g has intensity around `intensities[g]` and a prior favoring
/// tissue g. Rows are ordered group by group.
pub fn tissue_groups(intensities: [f64; 3], per_group: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let layout = FeatureLayout::from_names(&["intensity", "prior_csf", "prior_gm", "prior_wm"])
        .expect("valid layout");
    let mut rows = Vec::new();
    for (g, &center) in intensities.iter().enumerate() {
        for _ in 0..per_group {
            let mut prior = [0.0; 3];
            for p in &mut prior {
                *p = 0.1 + 0.05 * rng.gen::<f64>();
            }
            prior[g] = 0.7 + 0.1 * rng.gen::<f64>();
            let mut row = vec![center + 0.03 * standard_normal(&mut rng)];
            row.extend_from_slice(&prior);
            rows.push(row);
        }
    }
    let coords = (0..rows.len()).map(|i| VoxelCoord::new(i, 0, 0)).collect();
    Dataset::from_rows(&rows, coords, layout).expect("valid dataset")
}
