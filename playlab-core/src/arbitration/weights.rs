//! Online factor-weight adaptation.
//!
//! Called synchronously once per closed trade. Keeps a bounded history of
//! (entry factor vector, realized R). Once enough samples exist, the factor
//! whose values correlate most positively with realized R gains
//! `learning_rate`; weights are floored at `min_weight` and renormalized to
//! sum to 1.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::{Factor, FactorVector};
use crate::numeric::pearson;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeights {
    weights: FactorVector,
    history: VecDeque<(FactorVector, f64)>,
}

/// Parameters of one learning step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningParams {
    pub learning_rate: f64,
    pub min_weight: f64,
    pub min_samples: usize,
    pub window: usize,
}

impl AdaptiveWeights {
    pub fn new(initial: FactorVector) -> Self {
        Self {
            weights: initial,
            history: VecDeque::new(),
        }
    }

    pub fn weights(&self) -> &FactorVector {
        &self.weights
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    /// Record one outcome and nudge the weights. Returns the rewarded factor.
    pub fn learn(&mut self, factors: FactorVector, realized_r: f64, params: &LearningParams) -> Option<Factor> {
        if !realized_r.is_finite() {
            return None;
        }
        self.history.push_back((factors, realized_r));
        while self.history.len() > params.window.max(1) {
            self.history.pop_front();
        }
        if self.history.len() < params.min_samples.max(2) {
            return None;
        }

        let outcomes: Vec<f64> = self.history.iter().map(|(_, r)| *r).collect();
        let mut best: Option<(Factor, f64)> = None;
        for factor in Factor::ALL {
            let values: Vec<f64> = self.history.iter().map(|(f, _)| f.get(factor)).collect();
            let Some(rho) = pearson(&values, &outcomes) else {
                continue;
            };
            // strictly greater keeps the earliest factor on ties
            if rho > 0.0 && best.map_or(true, |(_, b)| rho > b) {
                best = Some((factor, rho));
            }
        }
        let (factor, _) = best?;

        let current = self.weights.get(factor);
        self.weights.set(factor, current + params.learning_rate);
        self.normalize(params.min_weight);
        Some(factor)
    }

    fn normalize(&mut self, min_weight: f64) {
        for w in self.weights.0.iter_mut() {
            if !w.is_finite() || *w < min_weight {
                *w = min_weight;
            }
        }
        let total = self.weights.sum();
        if total > 0.0 {
            for w in self.weights.0.iter_mut() {
                *w /= total;
            }
        }
    }
}
