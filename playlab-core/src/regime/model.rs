//! Frozen regime model: standardize → linear projection → Gaussian mixture.
//!
//! Produced offline by the runner's fitting pipeline and loaded as part of the
//! core configuration. The runtime never modifies it.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::RegimeLabel;
use crate::features::FEATURE_DIM;

/// One full-covariance Gaussian in projected space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    pub weight: f64,
    pub mean: Vec<f64>,
    /// Row-major k×k covariance.
    pub covariance: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeModel {
    /// Per-feature standardization mean.
    pub feature_mean: Vec<f64>,
    /// Per-feature standardization scale (> 0).
    pub feature_scale: Vec<f64>,
    /// Mean subtracted in standardized space before projection.
    pub projection_mean: Vec<f64>,
    /// k×d loadings; row i is the i-th retained axis.
    pub projection: Vec<Vec<f64>>,
    pub components: Vec<MixtureComponent>,
    /// Canonical label of each mixture component.
    pub cluster_labels: Vec<RegimeLabel>,
}

impl RegimeModel {
    /// Input dimension d.
    pub fn input_dim(&self) -> usize {
        self.feature_mean.len()
    }

    /// Projected dimension k.
    pub fn projected_dim(&self) -> usize {
        self.projection.len()
    }

    /// Standardize and project one feature vector.
    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        let z: Vec<f64> = x
            .iter()
            .zip(self.feature_mean.iter().zip(self.feature_scale.iter()))
            .zip(self.projection_mean.iter())
            .map(|((v, (m, s)), pm)| (v - m) / s - pm)
            .collect();
        self.projection
            .iter()
            .map(|row| row.iter().zip(z.iter()).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// Structural checks. Positive-definiteness is checked when the
    /// classifier factorizes the covariances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.input_dim();
        if d != FEATURE_DIM {
            return Err(model_error(format!(
                "model expects {d} features, feature engine provides {FEATURE_DIM}"
            )));
        }
        if self.feature_scale.len() != d || self.projection_mean.len() != d {
            return Err(model_error("standardization vectors differ in length".into()));
        }
        if self
            .feature_mean
            .iter()
            .chain(self.projection_mean.iter())
            .any(|v| !v.is_finite())
        {
            return Err(model_error("non-finite standardization mean".into()));
        }
        if self.feature_scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(model_error("feature scales must be finite and > 0".into()));
        }

        let k = self.projected_dim();
        if k == 0 || k > d {
            return Err(model_error(format!("projection must keep 1..={d} axes, got {k}")));
        }
        for (i, row) in self.projection.iter().enumerate() {
            if row.len() != d || row.iter().any(|v| !v.is_finite()) {
                return Err(model_error(format!("projection row {i} is malformed")));
            }
        }

        if self.components.is_empty() {
            return Err(model_error("mixture has no components".into()));
        }
        if self.cluster_labels.len() != self.components.len() {
            return Err(model_error(format!(
                "{} cluster labels for {} components",
                self.cluster_labels.len(),
                self.components.len()
            )));
        }
        for (c, comp) in self.components.iter().enumerate() {
            if !comp.weight.is_finite() || comp.weight <= 0.0 {
                return Err(model_error(format!("component {c} weight must be > 0")));
            }
            if comp.mean.len() != k || comp.mean.iter().any(|v| !v.is_finite()) {
                return Err(model_error(format!("component {c} mean is malformed")));
            }
            if comp.covariance.len() != k || comp.covariance.iter().any(|r| r.len() != k) {
                return Err(model_error(format!("component {c} covariance is not {k}x{k}")));
            }
            for i in 0..k {
                for j in 0..i {
                    let (a, b) = (comp.covariance[i][j], comp.covariance[j][i]);
                    if !a.is_finite() || (a - b).abs() > 1e-9 * (1.0 + a.abs().max(b.abs())) {
                        return Err(model_error(format!("component {c} covariance is not symmetric")));
                    }
                }
            }
        }
        Ok(())
    }
}

fn model_error(reason: String) -> ConfigError {
    ConfigError::RegimeModel(reason)
}
