//! Full-covariance Gaussian mixture fitted by expectation-maximization.
//!
//! Initialization is seeded k-means++: the first center is drawn uniformly,
//! each further center with probability proportional to its squared distance
//! from the nearest chosen center. Every covariance estimate is regularized
//! by adding `regularization × I`.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use playlab_core::numeric::log_sum_exp;
use playlab_core::regime::MixtureComponent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::FitError;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// EM settings for one candidate component count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmSettings {
    pub max_iterations: usize,
    /// Relative log-likelihood change that counts as converged.
    pub tolerance: f64,
    pub regularization: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixture {
    pub weights: Vec<f64>,
    pub means: Vec<DVector<f64>>,
    pub covariances: Vec<DMatrix<f64>>,
    /// Total log-likelihood of the training data.
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl GaussianMixture {
    pub fn components(&self) -> usize {
        self.weights.len()
    }

    pub fn dims(&self) -> usize {
        self.means.first().map(|m| m.len()).unwrap_or(0)
    }

    /// Free parameters: weights, means and full symmetric covariances.
    pub fn parameter_count(&self) -> usize {
        let (k, d) = (self.components(), self.dims());
        (k - 1) + k * d + k * d * (d + 1) / 2
    }

    /// Bayesian information criterion on `n` samples. Lower is better.
    pub fn bic(&self, n: usize) -> f64 {
        -2.0 * self.log_likelihood + self.parameter_count() as f64 * (n as f64).ln()
    }

    /// Component posteriors for one projected point.
    pub fn posteriors(&self, x: &DVector<f64>) -> Result<Vec<f64>, FitError> {
        let densities = Densities::new(self)?;
        let log_joint = densities.log_joint(x);
        let lse = log_sum_exp(&log_joint);
        Ok(log_joint.iter().map(|lp| (lp - lse).exp()).collect())
    }

    /// Components in the shape the core's regime model stores.
    pub fn to_components(&self) -> Vec<MixtureComponent> {
        self.weights
            .iter()
            .zip(self.means.iter().zip(self.covariances.iter()))
            .map(|(&weight, (mean, cov))| MixtureComponent {
                weight,
                mean: mean.iter().copied().collect(),
                covariance: (0..cov.nrows())
                    .map(|i| {
                        // average the off-diagonal pair so the stored matrix is exactly symmetric
                        (0..cov.ncols()).map(|j| 0.5 * (cov[(i, j)] + cov[(j, i)])).collect()
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Per-component log-normalizer and Cholesky factor.
struct Densities {
    log_norm: Vec<f64>,
    factors: Vec<Cholesky<f64, Dyn>>,
    means: Vec<DVector<f64>>,
}

impl Densities {
    fn new(mixture: &GaussianMixture) -> Result<Self, FitError> {
        let d = mixture.dims() as f64;
        let mut log_norm = Vec::with_capacity(mixture.components());
        let mut factors = Vec::with_capacity(mixture.components());
        for (c, cov) in mixture.covariances.iter().enumerate() {
            let chol = cov.clone().cholesky().ok_or(FitError::SingularCovariance {
                components: mixture.components(),
                component: c,
            })?;
            let log_det = 2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
            log_norm.push(mixture.weights[c].max(f64::MIN_POSITIVE).ln() - 0.5 * (d * LN_2PI + log_det));
            factors.push(chol);
        }
        Ok(Self {
            log_norm,
            factors,
            means: mixture.means.clone(),
        })
    }

    fn log_joint(&self, x: &DVector<f64>) -> Vec<f64> {
        self.factors
            .iter()
            .zip(self.means.iter().zip(self.log_norm.iter()))
            .map(|(chol, (mean, norm))| {
                let diff = x - mean;
                let solved = chol.l_dirty().solve_lower_triangular(&diff).unwrap_or(diff);
                norm - 0.5 * solved.norm_squared()
            })
            .collect()
    }
}

/// Fit a `k`-component mixture to `data` (one row per sample).
pub fn fit(data: &[DVector<f64>], k: usize, settings: &EmSettings) -> Result<GaussianMixture, FitError> {
    let n = data.len();
    if k == 0 || n < k * 2 {
        return Err(FitError::InsufficientData {
            have: n,
            need: (k * 2).max(1),
        });
    }
    let d = data[0].len();
    let reg = DMatrix::<f64>::identity(d, d) * settings.regularization;

    let global = covariance(data, &vec![1.0; n], &mean_of(data), n as f64) + &reg;
    let mut mixture = GaussianMixture {
        weights: vec![1.0 / k as f64; k],
        means: kmeans_plus_plus(data, k, settings.seed),
        covariances: vec![global; k],
        log_likelihood: f64::NEG_INFINITY,
        iterations: 0,
        converged: false,
    };

    let mut resp = vec![vec![0.0; k]; n];
    for iteration in 1..=settings.max_iterations {
        // E-step
        let densities = Densities::new(&mixture)?;
        let mut log_likelihood = 0.0;
        for (x, r) in data.iter().zip(resp.iter_mut()) {
            let log_joint = densities.log_joint(x);
            let lse = log_sum_exp(&log_joint);
            log_likelihood += lse;
            for (slot, lp) in r.iter_mut().zip(log_joint.iter()) {
                *slot = (lp - lse).exp();
            }
        }

        let previous = mixture.log_likelihood;
        mixture.log_likelihood = log_likelihood;
        mixture.iterations = iteration;
        if previous.is_finite()
            && (log_likelihood - previous).abs() <= settings.tolerance * (1.0 + log_likelihood.abs())
        {
            mixture.converged = true;
            break;
        }

        // M-step
        for c in 0..k {
            let weights: Vec<f64> = resp.iter().map(|r| r[c]).collect();
            let nk: f64 = weights.iter().sum();
            if nk < 1e-8 {
                return Err(FitError::CollapsedComponent {
                    components: k,
                    component: c,
                });
            }
            let mean = data
                .iter()
                .zip(weights.iter())
                .fold(DVector::<f64>::zeros(d), |acc, (x, w)| acc + x * *w)
                / nk;
            mixture.covariances[c] = covariance(data, &weights, &mean, nk) + &reg;
            mixture.means[c] = mean;
            mixture.weights[c] = nk / n as f64;
        }
    }
    Ok(mixture)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn mean_of(data: &[DVector<f64>]) -> DVector<f64> {
    let d = data[0].len();
    data.iter().fold(DVector::<f64>::zeros(d), |acc, x| acc + x) / data.len() as f64
}

/// Weighted scatter of `data` around `mean`, divided by `total`.
fn covariance(data: &[DVector<f64>], weights: &[f64], mean: &DVector<f64>, total: f64) -> DMatrix<f64> {
    let d = mean.len();
    let mut scatter = DMatrix::<f64>::zeros(d, d);
    for (x, w) in data.iter().zip(weights.iter()) {
        let diff = x - mean;
        scatter += (&diff * diff.transpose()) * *w;
    }
    scatter / total
}

/// Seeded k-means++ centers.
fn kmeans_plus_plus(data: &[DVector<f64>], k: usize, seed: u64) -> Vec<DVector<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers = vec![data[rng.gen_range(0..data.len())].clone()];
    while centers.len() < k {
        let dist: Vec<f64> = data
            .iter()
            .map(|x| {
                centers
                    .iter()
                    .map(|c| (x - c).norm_squared())
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = dist.iter().sum();
        let next = if total <= 0.0 || !total.is_finite() {
            rng.gen_range(0..data.len())
        } else {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = data.len() - 1;
            for (i, d) in dist.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };
        centers.push(data[next].clone());
    }
    centers
}
