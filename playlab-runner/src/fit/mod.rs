//! Offline regime-model fitting.
//!
//! Pipeline: standardize → PCA → one Gaussian mixture per candidate component
//! count (fitted in parallel) → BIC selection → majority-vote label mapping.
//! The output is a [`RegimeModel`] the core loads as frozen configuration.

pub mod labels;
pub mod mixture;
pub mod pca;

use nalgebra::DVector;
use playlab_core::config::ConfigError;
use playlab_core::domain::RegimeLabel;
use playlab_core::features::FEATURE_DIM;
use playlab_core::regime::{RegimeClassifier, RegimeModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mixture::{EmSettings, GaussianMixture};
use pca::{Pca, Standardizer};

#[derive(Debug, Error)]
pub enum FitError {
    #[error("need at least {need} samples, have {have}")]
    InsufficientData { have: usize, need: usize },

    #[error("degenerate corpus: {0}")]
    Degenerate(String),

    #[error("component {component} of {components} collapsed to zero weight")]
    CollapsedComponent { components: usize, component: usize },

    #[error("component {component} of {components} has a singular covariance")]
    SingularCovariance { components: usize, component: usize },

    #[error("{labels} regime tags for {bars} bars")]
    LabelMismatch { bars: usize, labels: usize },

    #[error("no candidate component count produced a mixture")]
    NoModel,

    #[error("fitted model rejected: {0}")]
    InvalidModel(#[from] ConfigError),
}

/// Fitting knobs. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Minimum cumulative variance share the PCA keeps.
    pub variance_retained: f64,
    pub min_components: usize,
    pub max_components: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Added to every covariance diagonal.
    pub covariance_regularization: f64,
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            variance_retained: 0.85,
            min_components: 2,
            max_components: 8,
            max_iterations: 200,
            tolerance: 1e-6,
            covariance_regularization: 1e-6,
            seed: 7,
        }
    }
}

impl FitConfig {
    fn em_settings(&self, components: usize) -> EmSettings {
        EmSettings {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            regularization: self.covariance_regularization,
            seed: self.seed.wrapping_add(components as u64),
        }
    }
}

/// Fitted model plus the diagnostics behind its selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub model: RegimeModel,
    /// (component count, BIC) for every candidate that fitted, ascending count.
    pub bic_by_components: Vec<(usize, f64)>,
    /// Variance share of each retained axis.
    pub explained_variance: Vec<f64>,
    pub retained_dims: usize,
    /// Share of validation vectors whose classified label matches their tag.
    pub validation_accuracy: Option<f64>,
}

impl FitReport {
    pub fn components(&self) -> usize {
        self.model.components.len()
    }
}

/// Fit a regime model to `corpus` and map its clusters with `validation`.
pub fn fit_regime_model(
    corpus: &[[f64; FEATURE_DIM]],
    validation: &[([f64; FEATURE_DIM], RegimeLabel)],
    cfg: &FitConfig,
) -> Result<FitReport, FitError> {
    let min_k = cfg.min_components.max(1);
    let max_k = cfg.max_components.max(min_k);
    let need = (2 * max_k).max(2 * FEATURE_DIM);
    if corpus.len() < need {
        return Err(FitError::InsufficientData {
            have: corpus.len(),
            need,
        });
    }

    let rows: Vec<Vec<f64>> = corpus.iter().map(|x| x.to_vec()).collect();
    let standardizer = Standardizer::fit(&rows)?;
    let standardized: Vec<Vec<f64>> = rows.iter().map(|r| standardizer.apply(r)).collect();
    let pca = Pca::fit(&standardized, cfg.variance_retained)?;
    debug!(dims = pca.dims(), explained = ?pca.explained, "projection fitted");

    let projected: Vec<DVector<f64>> = standardized
        .iter()
        .map(|z| DVector::from_vec(pca.project(z)))
        .collect();

    // collect() keeps component-count order regardless of scheduling
    let candidates: Vec<(usize, Result<GaussianMixture, FitError>)> = (min_k..=max_k)
        .into_par_iter()
        .map(|k| (k, mixture::fit(&projected, k, &cfg.em_settings(k))))
        .collect();

    let n = projected.len();
    let mut bic_by_components = Vec::new();
    let mut best: Option<(f64, GaussianMixture)> = None;
    for (k, candidate) in candidates {
        let gmm = match candidate {
            Ok(gmm) => gmm,
            Err(e) => {
                warn!(components = k, error = %e, "candidate skipped");
                continue;
            }
        };
        let bic = gmm.bic(n);
        debug!(components = k, bic, iterations = gmm.iterations, converged = gmm.converged, "candidate");
        bic_by_components.push((k, bic));
        // strict comparison: ties keep the smaller count seen first
        if best.as_ref().map_or(true, |(b, _)| bic < *b) {
            best = Some((bic, gmm));
        }
    }
    let (bic, gmm) = best.ok_or(FitError::NoModel)?;

    let mut model = RegimeModel {
        feature_mean: standardizer.mean.clone(),
        feature_scale: standardizer.scale.clone(),
        projection_mean: pca.mean.clone(),
        projection: pca.loadings.clone(),
        components: gmm.to_components(),
        cluster_labels: vec![RegimeLabel::Transitional; gmm.components()],
    };
    model.cluster_labels = labels::map_clusters(&model, validation)?;
    let classifier = RegimeClassifier::new(model.clone())?;

    let validation_accuracy = labels::accuracy(&classifier, validation);
    info!(
        components = gmm.components(),
        dims = pca.dims(),
        bic,
        accuracy = ?validation_accuracy,
        "regime model fitted"
    );

    Ok(FitReport {
        model,
        bic_by_components,
        retained_dims: pca.dims(),
        explained_variance: pca.explained,
        validation_accuracy,
    })
}
