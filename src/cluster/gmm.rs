//! Gaussian Mixture Model (GMM) for probabilistic clustering.
//!
//! Fits K full-covariance Gaussian components by Expectation-Maximization.
//! Densities are evaluated in log space through the Cholesky factor of each
//! covariance and normalized with log-sum-exp, so responsibilities stay
//! well defined even when every plain-space density underflows to zero.

use super::KMeans;
use crate::config::{GmmConfig, InitMethod};
use crate::error::{ConvergenceDiagnostics, Result, TissueMixError};
use crate::features::Dataset;
use crate::primitives::{Cholesky, Matrix};
use crate::traits::{ClusterModel, SoftClusterModel, UnsupervisedEstimator};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Keeps the effective count of an empty component away from zero.
const MIN_COMPONENT_MASS: f64 = 10.0 * f64::EPSILON;

/// One Gaussian component of the mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Mixing weight (prior probability of the component).
    pub weight: f64,
    /// Mean vector, length D.
    pub mean: Vec<f64>,
    /// Covariance, D×D symmetric positive definite.
    pub covariance: Matrix<f64>,
}

/// Progress of one EM iteration, handed to a [`FitObserver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationEvent {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Total dataset log-likelihood under the parameters entering this iteration.
    pub log_likelihood: f64,
    /// Change from the previous iteration; `None` on the first.
    pub delta: Option<f64>,
}

/// Receives per-iteration progress during a fit.
///
/// Implemented for every `FnMut(&IterationEvent)`.
pub trait FitObserver {
    /// Called once per EM iteration, after the E-step.
    fn on_iteration(&mut self, event: &IterationEvent);
}

impl<F: FnMut(&IterationEvent) + ?Sized> FitObserver for F {
    fn on_iteration(&mut self, event: &IterationEvent) {
        self(event);
    }
}

/// Summary of a finished fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// EM iterations run.
    pub n_iter: usize,
    /// True if the tolerance was met before the iteration budget ran out.
    pub converged: bool,
    /// Total log-likelihood at each iteration, oldest first.
    pub log_likelihood_trace: Vec<f64>,
    /// Total log-likelihood under the final parameters.
    pub final_log_likelihood: Option<f64>,
}

/// Explicit EM loop state.
#[derive(Debug, Clone)]
struct EmState {
    iteration: usize,
    log_likelihood: f64,
    converged: bool,
    trace: Vec<f64>,
}

impl EmState {
    fn new() -> Self {
        Self {
            iteration: 0,
            log_likelihood: f64::NEG_INFINITY,
            converged: false,
            trace: Vec::new(),
        }
    }

    /// Records a new log-likelihood and returns the event describing it.
    fn record(&mut self, log_likelihood: f64, tol: f64) -> IterationEvent {
        self.iteration += 1;
        let delta = (self.iteration > 1).then(|| log_likelihood - self.log_likelihood);
        if let Some(d) = delta {
            self.converged = d.abs() < tol;
        }
        self.log_likelihood = log_likelihood;
        self.trace.push(log_likelihood);
        IterationEvent {
            iteration: self.iteration,
            log_likelihood,
            delta,
        }
    }
}

/// Per-component constants of the log-density.
#[derive(Debug, Clone)]
struct Densities {
    log_weights: Vec<f64>,
    /// `-½ (D ln 2π + ln |Σ|)`
    log_norms: Vec<f64>,
    factors: Vec<Cholesky>,
}

impl Densities {
    /// Factorizes every covariance; on failure returns the component index.
    fn new(components: &[Component]) -> std::result::Result<Self, (usize, TissueMixError)> {
        let mut log_weights = Vec::with_capacity(components.len());
        let mut log_norms = Vec::with_capacity(components.len());
        let mut factors = Vec::with_capacity(components.len());
        for (k, c) in components.iter().enumerate() {
            let chol = c.covariance.cholesky().map_err(|e| (k, e))?;
            let d = c.mean.len() as f64;
            log_norms.push(-0.5 * (d * LN_2PI + chol.log_determinant()));
            log_weights.push(c.weight.ln());
            factors.push(chol);
        }
        Ok(Self {
            log_weights,
            log_norms,
            factors,
        })
    }
}

/// Numerically stable `ln Σ exp(v)`.
fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Fills `out` with `log w_k + log N(row | μ_k, Σ_k)` for every component.
fn log_terms(
    row: &[f64],
    components: &[Component],
    densities: &Densities,
    out: &mut [f64],
    diff: &mut [f64],
    scratch: &mut [f64],
) {
    for (k, c) in components.iter().enumerate() {
        for ((d, &x), &m) in diff.iter_mut().zip(row).zip(&c.mean) {
            *d = x - m;
        }
        let maha = densities.factors[k].mahalanobis_squared(diff, scratch);
        out[k] = densities.log_weights[k] + densities.log_norms[k] - 0.5 * maha;
    }
}

/// First component whose log-density term is non-finite on the first voxel
/// with a non-finite log-likelihood.
fn offending_component(
    x: &Matrix<f64>,
    components: &[Component],
    densities: &Densities,
    lse: &[f64],
) -> Option<usize> {
    let row = lse.iter().position(|l| !l.is_finite())?;
    let d = x.n_cols();
    let mut terms = vec![0.0; components.len()];
    let (mut diff, mut scratch) = (vec![0.0; d], vec![0.0; d]);
    log_terms(x.row(row), components, densities, &mut terms, &mut diff, &mut scratch);
    terms.iter().position(|t| !t.is_finite())
}

/// Fills `out` with the responsibilities of one voxel and returns its
/// log-likelihood contribution.
fn row_responsibilities(
    row: &[f64],
    components: &[Component],
    densities: &Densities,
    out: &mut [f64],
    diff: &mut [f64],
    scratch: &mut [f64],
) -> f64 {
    log_terms(row, components, densities, out, diff, scratch);
    let lse = log_sum_exp(out);
    for v in out.iter_mut() {
        *v = (*v - lse).exp();
    }
    lse
}

/// E-step: responsibilities (N×K) and per-voxel log-likelihoods.
fn e_step(x: &Matrix<f64>, components: &[Component], densities: &Densities) -> (Matrix<f64>, Vec<f64>) {
    let (n, d) = x.shape();
    let k = components.len();
    let mut resp = Matrix::zeros(n, k);
    let mut lse = vec![0.0; n];

    #[cfg(feature = "parallel")]
    resp.as_mut_slice()
        .par_chunks_mut(k)
        .zip(x.as_slice().par_chunks(d))
        .zip(lse.par_iter_mut())
        .for_each_init(
            || (vec![0.0; d], vec![0.0; d]),
            |(diff, scratch), ((out, row), l)| {
                *l = row_responsibilities(row, components, densities, out, diff, scratch);
            },
        );

    #[cfg(not(feature = "parallel"))]
    {
        let mut diff = vec![0.0; d];
        let mut scratch = vec![0.0; d];
        for (i, l) in lse.iter_mut().enumerate() {
            *l = row_responsibilities(
                x.row(i),
                components,
                densities,
                resp.row_mut(i),
                &mut diff,
                &mut scratch,
            );
        }
    }

    (resp, lse)
}

/// M-step: weights, means and regularized covariances from responsibilities.
fn m_step(x: &Matrix<f64>, resp: &Matrix<f64>, reg_covar: f64) -> Vec<Component> {
    let (_, d) = x.shape();
    let k = resp.n_cols();

    let mut nk = vec![MIN_COMPONENT_MASS; k];
    let mut sums = vec![vec![0.0; d]; k];
    for (row, r) in x.rows().zip(resp.rows()) {
        for c in 0..k {
            nk[c] += r[c];
            for (s, &v) in sums[c].iter_mut().zip(row) {
                *s += r[c] * v;
            }
        }
    }
    let total: f64 = nk.iter().sum();

    let mut components = Vec::with_capacity(k);
    let mut diff = vec![0.0; d];
    for c in 0..k {
        let mean: Vec<f64> = sums[c].iter().map(|s| s / nk[c]).collect();

        let mut cov = Matrix::zeros(d, d);
        let cov_data = cov.as_mut_slice();
        for (row, r) in x.rows().zip(resp.rows()) {
            let w = r[c];
            if w == 0.0 {
                continue;
            }
            for j in 0..d {
                diff[j] = row[j] - mean[j];
            }
            for a in 0..d {
                let wa = w * diff[a];
                for b in a..d {
                    cov_data[a * d + b] += wa * diff[b];
                }
            }
        }
        for a in 0..d {
            for b in a..d {
                let v = cov_data[a * d + b] / nk[c];
                cov_data[a * d + b] = v;
                cov_data[b * d + a] = v;
            }
        }
        cov.add_diagonal(reg_covar);

        components.push(Component {
            weight: nk[c] / total,
            mean,
            covariance: cov,
        });
    }
    components
}

/// Gaussian Mixture Model (GMM) estimator.
///
/// An immutable configuration; [`UnsupervisedEstimator::fit`] returns a
/// [`FittedMixture`].
///
/// # Algorithm
///
/// 1. **E-step**: log-space responsibilities and the total log-likelihood
/// 2. **M-step**: update weights, means and full covariances, add `reg·I`
/// 3. Repeat until the log-likelihood changes by less than `tolerance`
///
/// # Examples
///
/// ```
/// use tissuemix::prelude::*;
///
/// let data = Dataset::from_features(Matrix::from_vec(6, 2, vec![
///     1.0, 1.0, 1.1, 1.0, 1.0, 1.1,
///     5.0, 5.0, 5.1, 5.0, 5.0, 5.1,
/// ]).unwrap()).unwrap();
///
/// let model = GaussianMixture::new(2).with_random_state(7).fit(&data).unwrap();
/// let labels = model.predict(&data).unwrap();
/// assert_eq!(labels.len(), 6);
///
/// let proba = model.predict_proba(&data).unwrap();
/// assert_eq!(proba.shape(), (6, 2));
/// ```
///
/// # Performance
///
/// - Time complexity: O(nkd²i) where n=samples, k=components, d=features, i=iterations
/// - Space complexity: O(nk + kd²)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    config: GmmConfig,
}

impl Default for GaussianMixture {
    fn default() -> Self {
        Self::from_config(GmmConfig::default())
    }
}

impl GaussianMixture {
    /// Create a mixture with `n_components` and default options.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            config: GmmConfig {
                n_components,
                ..GmmConfig::default()
            },
        }
    }

    /// Create a mixture from a full configuration.
    #[must_use]
    pub fn from_config(config: GmmConfig) -> Self {
        Self { config }
    }

    /// Set maximum number of EM iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance on the total log-likelihood.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tolerance = tol;
        self
    }

    /// Set random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the covariance regularization floor.
    #[must_use]
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.config.covariance_regularization = reg_covar;
        self
    }

    /// Set the initialization strategy.
    #[must_use]
    pub fn with_init(mut self, init: InitMethod) -> Self {
        self.config.init = init;
        self
    }

    /// Get number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.config.n_components
    }

    /// The full configuration.
    #[must_use]
    pub fn config(&self) -> &GmmConfig {
        &self.config
    }

    /// Fits the mixture, reporting every iteration to `observer`.
    ///
    /// Returns the frozen model together with the responsibilities under the
    /// final parameters.
    ///
    /// # Errors
    ///
    /// - `InvalidHyperparameter` for an invalid configuration
    /// - `InvalidInput` for an empty dataset or fewer voxels than components
    /// - `ConvergenceFailure` when a covariance cannot be factorized after
    ///   regularization or the log-likelihood becomes non-finite
    pub fn fit_with_observer<O: FitObserver + ?Sized>(
        &self,
        data: &Dataset,
        observer: &mut O,
    ) -> Result<FitOutput> {
        self.config.validate()?;
        let x = data.features();
        let (n_samples, n_features) = x.shape();
        let k = self.config.n_components;

        if n_samples == 0 {
            return Err(TissueMixError::empty_input("mixture training data"));
        }
        if n_samples < k {
            return Err(TissueMixError::invalid_input(format!(
                "fewer voxels ({n_samples}) than mixture components ({k})"
            )));
        }

        let mut components = self.initialize(data)?;
        let mut densities = self.factorize(&components, 0, &components, &[])?;
        let mut state = EmState::new();

        while state.iteration < self.config.max_iterations {
            let (resp, lse) = e_step(x, &components, &densities);
            let log_likelihood: f64 = lse.iter().sum();
            if !log_likelihood.is_finite() {
                return Err(self.failure(
                    state.iteration + 1,
                    offending_component(x, &components, &densities, &lse),
                    format!("log-likelihood became {log_likelihood}"),
                    &components,
                    &state.trace,
                ));
            }

            let event = state.record(log_likelihood, self.config.tolerance);
            debug!(
                iteration = event.iteration,
                log_likelihood,
                delta = event.delta.unwrap_or(f64::NAN),
                "EM iteration"
            );
            observer.on_iteration(&event);

            if state.converged {
                break;
            }

            let updated = m_step(x, &resp, self.config.covariance_regularization);
            densities = self.factorize(&updated, state.iteration, &components, &state.trace)?;
            components = updated;
        }

        let (responsibilities, lse) = e_step(x, &components, &densities);
        let final_log_likelihood: f64 = lse.iter().sum();
        if !final_log_likelihood.is_finite() {
            return Err(self.failure(
                state.iteration,
                offending_component(x, &components, &densities, &lse),
                format!("final log-likelihood became {final_log_likelihood}"),
                &components,
                &state.trace,
            ));
        }

        if state.converged {
            info!(
                n_iter = state.iteration,
                log_likelihood = final_log_likelihood,
                "EM converged"
            );
        } else {
            info!(
                n_iter = state.iteration,
                log_likelihood = final_log_likelihood,
                "EM stopped at iteration budget without meeting tolerance"
            );
        }

        let report = FitReport {
            n_iter: state.iteration,
            converged: state.converged,
            log_likelihood_trace: state.trace,
            final_log_likelihood: Some(final_log_likelihood),
        };

        Ok(FitOutput {
            model: FittedMixture {
                components,
                densities,
                n_features,
                report,
            },
            responsibilities,
        })
    }

    /// Means from the configured strategy, covariances from the whole
    /// dataset, uniform weights.
    fn initialize(&self, data: &Dataset) -> Result<Vec<Component>> {
        let x = data.features();
        let k = self.config.n_components;

        let means: Vec<Vec<f64>> = match self.config.init {
            InitMethod::KMeans => {
                let km = KMeans::new(k)
                    .with_random_state(self.config.seed)
                    .with_max_iter(100)
                    .fit(data)?;
                km.centroids().rows().map(<[f64]>::to_vec).collect()
            }
            InitMethod::RandomSamples => {
                let mut rng = StdRng::seed_from_u64(self.config.seed);
                rand::seq::index::sample(&mut rng, x.n_rows(), k)
                    .into_iter()
                    .map(|i| x.row(i).to_vec())
                    .collect()
            }
        };

        let mut covariance = x.covariance();
        covariance.add_diagonal(self.config.covariance_regularization);
        let weight = 1.0 / k as f64;

        Ok(means
            .into_iter()
            .map(|mean| Component {
                weight,
                mean,
                covariance: covariance.clone(),
            })
            .collect())
    }

    /// Factorizes `components`, turning a failure into `ConvergenceFailure`
    /// that carries `last_valid`.
    fn factorize(
        &self,
        components: &[Component],
        iteration: usize,
        last_valid: &[Component],
        trace: &[f64],
    ) -> Result<Densities> {
        Densities::new(components).map_err(|(k, cause)| {
            self.failure(
                iteration,
                Some(k),
                format!("covariance not positive definite after regularization ({cause})"),
                last_valid,
                trace,
            )
        })
    }

    fn failure(
        &self,
        iteration: usize,
        component: Option<usize>,
        reason: String,
        last_valid: &[Component],
        trace: &[f64],
    ) -> TissueMixError {
        warn!(iteration, component, %reason, "EM fit abandoned");
        TissueMixError::ConvergenceFailure(Box::new(ConvergenceDiagnostics {
            iteration,
            component,
            reason,
            last_valid: last_valid.to_vec(),
            log_likelihood_trace: trace.to_vec(),
        }))
    }
}

impl UnsupervisedEstimator for GaussianMixture {
    type Fitted = FittedMixture;

    fn fit(&self, data: &Dataset) -> Result<FittedMixture> {
        self.fit_with_observer(data, &mut |_: &IterationEvent| {})
            .map(|out| out.model)
    }
}

/// A fitted model plus its training responsibilities.
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// The frozen mixture.
    pub model: FittedMixture,
    /// N×K responsibilities of the training voxels under `model`.
    pub responsibilities: Matrix<f64>,
}

/// Serialized form of a [`FittedMixture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MixtureParams {
    components: Vec<Component>,
    report: FitReport,
}

/// A frozen Gaussian mixture.
///
/// Serializes as its components and fit report; the Cholesky factors are
/// rebuilt (and the parameters re-validated) on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MixtureParams", into = "MixtureParams")]
pub struct FittedMixture {
    components: Vec<Component>,
    densities: Densities,
    n_features: usize,
    report: FitReport,
}

impl PartialEq for FittedMixture {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.report == other.report
    }
}

impl FittedMixture {
    /// Builds a model from explicit components.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if there are no components, dimensions
    /// disagree, any value is non-finite, weights are negative or do not sum
    /// to 1 (within 1e-6), or a covariance is not symmetric positive definite.
    pub fn from_components(components: Vec<Component>, report: FitReport) -> Result<Self> {
        let first = components
            .first()
            .ok_or_else(|| TissueMixError::empty_input("mixture components"))?;
        let d = first.mean.len();
        if d == 0 {
            return Err(TissueMixError::invalid_input("component means are empty"));
        }

        let mut weight_sum = 0.0;
        for (k, c) in components.iter().enumerate() {
            if c.mean.len() != d || c.covariance.shape() != (d, d) {
                return Err(TissueMixError::invalid_input(format!(
                    "component {k} does not have dimension {d}"
                )));
            }
            if !(c.weight.is_finite() && c.weight >= 0.0) {
                return Err(TissueMixError::invalid_input(format!(
                    "component {k} has invalid weight {}",
                    c.weight
                )));
            }
            if !c.mean.iter().all(|v| v.is_finite()) || !c.covariance.is_finite() {
                return Err(TissueMixError::invalid_input(format!(
                    "component {k} has non-finite parameters"
                )));
            }
            let scale = c
                .covariance
                .as_slice()
                .iter()
                .fold(1.0_f64, |m, v| m.max(v.abs()));
            if !c.covariance.is_symmetric(1e-9 * scale) {
                return Err(TissueMixError::invalid_input(format!(
                    "component {k} covariance is not symmetric"
                )));
            }
            weight_sum += c.weight;
        }
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(TissueMixError::invalid_input(format!(
                "mixing weights sum to {weight_sum}, expected 1"
            )));
        }

        let densities = Densities::new(&components).map_err(|(k, cause)| {
            TissueMixError::invalid_input(format!("component {k} covariance: {cause}"))
        })?;

        Ok(Self {
            components,
            densities,
            n_features: d,
            report,
        })
    }

    /// Get number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Components in index order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mixing weights in component order (sums to 1).
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Component means (k × d).
    #[must_use]
    pub fn means(&self) -> Matrix<f64> {
        let mut m = Matrix::zeros(self.components.len(), self.n_features);
        for (k, c) in self.components.iter().enumerate() {
            m.row_mut(k).copy_from_slice(&c.mean);
        }
        m
    }

    /// Iteration count and log-likelihood trace of the fit.
    #[must_use]
    pub fn report(&self) -> &FitReport {
        &self.report
    }

    /// Log-likelihood of each voxel under the mixture.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the dataset has a different D.
    pub fn score_samples(&self, data: &Dataset) -> Result<Vec<f64>> {
        data.check_dim(self.n_features)?;
        Ok(e_step(data.features(), &self.components, &self.densities).1)
    }

    /// Mean per-voxel log-likelihood.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the dataset has a different D, or
    /// `InvalidInput` for an empty dataset.
    pub fn score(&self, data: &Dataset) -> Result<f64> {
        if data.is_empty() {
            return Err(TissueMixError::empty_input("scoring data"));
        }
        let ll = self.score_samples(data)?;
        Ok(ll.iter().sum::<f64>() / ll.len() as f64)
    }
}

impl ClusterModel for FittedMixture {
    fn n_clusters(&self) -> usize {
        self.components.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Component with the highest responsibility per voxel (ties go to the
    /// lower index), exactly the arg-max of [`SoftClusterModel::predict_proba`].
    fn predict(&self, data: &Dataset) -> Result<Vec<usize>> {
        Ok(self.predict_proba(data)?.argmax_rows())
    }
}

impl SoftClusterModel for FittedMixture {
    fn predict_proba(&self, data: &Dataset) -> Result<Matrix<f64>> {
        data.check_dim(self.n_features)?;
        Ok(e_step(data.features(), &self.components, &self.densities).0)
    }
}

impl TryFrom<MixtureParams> for FittedMixture {
    type Error = TissueMixError;

    fn try_from(params: MixtureParams) -> Result<Self> {
        Self::from_components(params.components, params.report)
    }
}

impl From<FittedMixture> for MixtureParams {
    fn from(model: FittedMixture) -> Self {
        Self {
            components: model.components,
            report: model.report,
        }
    }
}
