//! Clustering algorithms.
//!
//! [`GaussianMixture`] is the segmentation engine; [`KMeans`] seeds its
//! component means.

mod gmm;
mod kmeans;

pub use gmm::{
    Component, FitObserver, FitOutput, FitReport, FittedMixture, GaussianMixture, IterationEvent,
};
pub use kmeans::{KMeans, KMeansModel};

#[cfg(test)]
mod tests_gmm_contract;
