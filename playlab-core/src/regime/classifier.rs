//! Online regime scorer.
//!
//! Each covariance is Cholesky-factorized once at construction; scoring a bar
//! is a handful of small matrix-vector products plus a log-sum-exp.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::config::ConfigError;
use crate::domain::{RegimeAssignment, RegimeLabel};
use crate::features::FeatureSnapshot;
use crate::numeric::log_sum_exp;

use super::model::RegimeModel;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

#[derive(Debug, Clone)]
struct PreparedComponent {
    mean: DVector<f64>,
    precision: DMatrix<f64>,
    /// ln(weight) - 0.5 * (k ln 2π + ln|Σ|)
    log_norm: f64,
    label: RegimeLabel,
}

/// Frozen, side-effect-free regime scorer.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    model: RegimeModel,
    components: Vec<PreparedComponent>,
}

impl RegimeClassifier {
    pub fn new(model: RegimeModel) -> Result<Self, ConfigError> {
        model.validate()?;
        let k = model.projected_dim();
        let total_weight: f64 = model.components.iter().map(|c| c.weight).sum();

        let mut components = Vec::with_capacity(model.components.len());
        for (idx, (comp, label)) in model
            .components
            .iter()
            .zip(model.cluster_labels.iter())
            .enumerate()
        {
            let cov = DMatrix::from_fn(k, k, |i, j| comp.covariance[i][j]);
            let chol = cov.cholesky().ok_or_else(|| {
                ConfigError::RegimeModel(format!("component {idx} covariance is not positive definite"))
            })?;
            let log_det: f64 = 2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
            if !log_det.is_finite() {
                return Err(ConfigError::RegimeModel(format!(
                    "component {idx} covariance is singular"
                )));
            }
            components.push(PreparedComponent {
                mean: DVector::from_column_slice(&comp.mean),
                precision: chol.inverse(),
                log_norm: (comp.weight / total_weight).ln() - 0.5 * (k as f64 * LN_2PI + log_det),
                label: *label,
            });
        }

        Ok(Self { model, components })
    }

    pub fn model(&self) -> &RegimeModel {
        &self.model
    }

    /// Posterior over mixture components for a raw feature vector.
    ///
    /// Returns `None` for non-finite input.
    pub fn cluster_posteriors(&self, x: &[f64]) -> Option<Vec<f64>> {
        if x.len() != self.model.input_dim() || x.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let y = DVector::from_vec(self.model.transform(x));
        let log_joint: Vec<f64> = self
            .components
            .iter()
            .map(|c| {
                let diff = &y - &c.mean;
                let mahalanobis = diff.dot(&(&c.precision * &diff));
                c.log_norm - 0.5 * mahalanobis
            })
            .collect();
        let lse = log_sum_exp(&log_joint);
        if !lse.is_finite() {
            return None;
        }
        Some(log_joint.iter().map(|lp| (lp - lse).exp()).collect())
    }

    /// Label, probability vector and clarity for one bar.
    ///
    /// Unusable features give the undetermined assignment so that regime
    /// gates fail closed.
    pub fn classify(&self, features: &FeatureSnapshot) -> RegimeAssignment {
        let Some(x) = features.vector() else {
            return RegimeAssignment::undetermined();
        };
        let Some(posteriors) = self.cluster_posteriors(&x) else {
            return RegimeAssignment::undetermined();
        };

        let mut probabilities = [0.0; RegimeLabel::COUNT];
        for (p, comp) in posteriors.iter().zip(self.components.iter()) {
            probabilities[comp.label.index()] += p;
        }
        let assignment = RegimeAssignment::from_probabilities(probabilities);
        trace!(
            timestamp = %features.timestamp,
            label = %assignment.label,
            clarity = assignment.clarity,
            "regime"
        );
        assignment
    }
}
