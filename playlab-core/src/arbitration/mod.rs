//! Signal arbitration: pick at most one entry per bar.
//!
//! Candidates first pass redundancy suppression (near-duplicates collapse
//! onto the stronger one), then each survivor is scored as the dot product of
//! its five-factor vector with the adaptive weights. The highest score wins;
//! ties go to the lowest playbook id.
//!
//! `arbitrate` is pure with respect to the arbitrator. Weight updates happen
//! only through [`Arbitrator::learn`], once per closed trade.

pub mod factors;
pub mod redundancy;
pub mod weights;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::domain::{ClosedTrade, Factor, FactorVector, Position, Signal};
use crate::playbook::{PlaybookStats, StatsRegistry};
use crate::sizing::CorrelationTracker;

pub use weights::{AdaptiveWeights, LearningParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitratorConfig {
    /// Initial factor weights, in [`Factor`] order. Must sum to 1.
    pub weights: [f64; Factor::COUNT],
    /// Pairs scoring above this are redundant. In [0, 1) so identical
    /// signals (similarity 1) always collapse.
    pub similarity_threshold: f64,
    /// Share of similarity carried by price proximity; the rest by alignment.
    pub price_similarity_weight: f64,
    pub learning_rate: f64,
    pub min_weight: f64,
    /// Closed trades required before the first weight update.
    pub learning_min_samples: usize,
    /// Most recent closed trades kept for learning.
    pub learning_window: usize,
    pub hour_min_samples: usize,
    pub efficiency_min_samples: usize,
    pub efficiency_scale: f64,
    pub default_holding_bars: f64,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            weights: [0.30, 0.15, 0.20, 0.15, 0.20],
            similarity_threshold: 0.85,
            price_similarity_weight: 0.6,
            learning_rate: 0.02,
            min_weight: 0.02,
            learning_min_samples: 8,
            learning_window: 100,
            hour_min_samples: 5,
            efficiency_min_samples: 5,
            efficiency_scale: 10.0,
            default_holding_bars: 20.0,
        }
    }
}

impl ArbitratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Weights(format!(
                "weights must be finite and non-negative, got {:?}",
                self.weights
            )));
        }
        let total: f64 = self.weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Weights(format!("weights must sum to 1, got {total}")));
        }
        if !(0.0..1.0).contains(&self.min_weight) || self.min_weight * Factor::COUNT as f64 > 1.0 {
            return Err(invalid("min_weight", format!("{} leaves no room to adapt", self.min_weight)));
        }
        if !(0.0..1.0).contains(&self.similarity_threshold) {
            return Err(invalid(
                "similarity_threshold",
                format!("must be in [0, 1), got {}", self.similarity_threshold),
            ));
        }
        unit_interval("price_similarity_weight", self.price_similarity_weight)?;
        if !(0.0..1.0).contains(&self.learning_rate) {
            return Err(invalid("learning_rate", format!("must be in [0, 1), got {}", self.learning_rate)));
        }
        if self.learning_window < self.learning_min_samples || self.learning_min_samples < 2 {
            return Err(invalid(
                "learning_window",
                format!(
                    "need 2 <= learning_min_samples ({}) <= learning_window ({})",
                    self.learning_min_samples, self.learning_window
                ),
            ));
        }
        if !(self.efficiency_scale > 0.0) || !(self.default_holding_bars > 0.0) {
            return Err(invalid("efficiency_scale", "scale and default holding bars must be > 0".into()));
        }
        Ok(())
    }

    fn learning_params(&self) -> LearningParams {
        LearningParams {
            learning_rate: self.learning_rate,
            min_weight: self.min_weight,
            min_samples: self.learning_min_samples,
            window: self.learning_window,
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn invalid(name: &str, reason: String) -> ConfigError {
    ConfigError::InvalidParam {
        section: "arbitrator".into(),
        name: name.into(),
        reason,
    }
}

fn unit_interval(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("must be in [0, 1], got {value}")))
    }
}

// ─── Arbitration ─────────────────────────────────────────────────────

/// Read-only state the factors are computed against.
#[derive(Debug, Clone, Copy)]
pub struct ArbitrationContext<'a> {
    pub stats: &'a StatsRegistry,
    pub open_positions: &'a [Position],
    pub correlations: &'a CorrelationTracker,
    /// Hour of the current bar.
    pub hour: u32,
}

/// A candidate with its factor vector and weighted score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSignal {
    pub signal: Signal,
    pub factors: FactorVector,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrationOutcome {
    pub selected: Option<ScoredSignal>,
    /// Every survivor of redundancy suppression, including the winner.
    pub scored: Vec<ScoredSignal>,
    pub suppressed: Vec<Signal>,
}

#[derive(Debug, Clone)]
pub struct Arbitrator {
    config: ArbitratorConfig,
    weights: AdaptiveWeights,
}

impl Arbitrator {
    pub fn new(config: ArbitratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let weights = AdaptiveWeights::new(FactorVector(config.weights));
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &ArbitratorConfig {
        &self.config
    }

    pub fn weights(&self) -> &FactorVector {
        self.weights.weights()
    }

    /// Select at most one candidate. An empty input yields no selection.
    pub fn arbitrate(&self, candidates: Vec<Signal>, ctx: &ArbitrationContext<'_>) -> ArbitrationOutcome {
        if candidates.is_empty() {
            return ArbitrationOutcome::default();
        }
        let (survivors, suppressed) = redundancy::suppress(
            candidates,
            self.config.similarity_threshold,
            self.config.price_similarity_weight,
        );
        for s in &suppressed {
            debug!(playbook = %s.playbook_id, direction = ?s.direction, "candidate suppressed as redundant");
        }

        let empty = PlaybookStats::default();
        let scored: Vec<ScoredSignal> = survivors
            .into_iter()
            .map(|signal| {
                let stats = ctx.stats.get(signal.playbook_id).unwrap_or(&empty);
                let factors = factors::compute(
                    &signal,
                    stats,
                    ctx.open_positions,
                    ctx.correlations,
                    ctx.hour,
                    &self.config,
                );
                let score = factors.dot(self.weights.weights());
                ScoredSignal { signal, factors, score }
            })
            .collect();

        let selected = scored
            .iter()
            .fold(None::<&ScoredSignal>, |best, cand| match best {
                None => Some(cand),
                Some(b) => {
                    let better = cand.score > b.score
                        || (cand.score == b.score && cand.signal.playbook_id < b.signal.playbook_id);
                    Some(if better { cand } else { b })
                }
            })
            .cloned();

        if let Some(s) = &selected {
            debug!(
                playbook = %s.signal.playbook_id,
                score = s.score,
                candidates = scored.len(),
                "arbitration selected"
            );
        }
        ArbitrationOutcome {
            selected,
            scored,
            suppressed,
        }
    }

    /// Feed one closed trade to the weight learner.
    pub fn learn(&mut self, trade: &ClosedTrade) -> Option<Factor> {
        let params = self.config.learning_params();
        let rewarded = self.weights.learn(trade.entry_factors, trade.realized_r, &params);
        if let Some(factor) = rewarded {
            debug!(?factor, weights = ?self.weights.weights().0, "factor weights updated");
        }
        rewarded
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::signal;
    use super::*;
    use crate::domain::{Direction, PlaybookId};

    fn ctx<'a>(stats: &'a StatsRegistry, tracker: &'a CorrelationTracker) -> ArbitrationContext<'a> {
        ArbitrationContext {
            stats,
            open_positions: &[],
            correlations: tracker,
            hour: 10,
        }
    }

    #[test]
    fn empty_candidates_select_nothing() {
        let arb = Arbitrator::new(ArbitratorConfig::default()).unwrap();
        let stats = StatsRegistry::default();
        let tracker = CorrelationTracker::new(50);
        let out = arb.arbitrate(vec![], &ctx(&stats, &tracker));
        assert!(out.selected.is_none());
        assert!(out.scored.is_empty());
    }

    #[test]
    fn single_candidate_passes_through_unchanged() {
        for weights in [[1.0, 0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0, 1.0]] {
            let config = ArbitratorConfig {
                weights,
                min_weight: 0.0,
                ..ArbitratorConfig::default()
            };
            let arb = Arbitrator::new(config).unwrap();
            let stats = StatsRegistry::default();
            let tracker = CorrelationTracker::new(50);
            let s = signal(3, Direction::Long, 100.0, 0.4, 0.2);
            let out = arb.arbitrate(vec![s.clone()], &ctx(&stats, &tracker));
            assert_eq!(out.selected.unwrap().signal, s);
        }
    }

    #[test]
    fn higher_alignment_wins() {
        let arb = Arbitrator::new(ArbitratorConfig::default()).unwrap();
        let stats = StatsRegistry::default();
        let tracker = CorrelationTracker::new(50);
        let a = signal(1, Direction::Long, 100.0, 0.5, 0.2);
        let b = signal(2, Direction::Short, 100.0, 0.5, 0.9);
        let out = arb.arbitrate(vec![a, b], &ctx(&stats, &tracker));
        assert_eq!(out.selected.unwrap().signal.playbook_id, PlaybookId(2));
        assert_eq!(out.scored.len(), 2);
    }

    #[test]
    fn exact_tie_goes_to_lowest_id() {
        let arb = Arbitrator::new(ArbitratorConfig::default()).unwrap();
        let stats = StatsRegistry::default();
        let tracker = CorrelationTracker::new(50);
        let a = signal(5, Direction::Long, 100.0, 0.5, 0.5);
        let b = signal(2, Direction::Short, 100.0, 0.5, 0.5);
        let out = arb.arbitrate(vec![a, b], &ctx(&stats, &tracker));
        assert_eq!(out.selected.unwrap().signal.playbook_id, PlaybookId(2));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let config = ArbitratorConfig {
            weights: [0.5, 0.5, 0.5, 0.0, 0.0],
            ..ArbitratorConfig::default()
        };
        assert!(matches!(Arbitrator::new(config), Err(ConfigError::Weights(_))));
    }

    #[test]
    fn similarity_threshold_of_one_is_rejected() {
        let config = ArbitratorConfig {
            similarity_threshold: 1.0,
            ..ArbitratorConfig::default()
        };
        assert!(matches!(
            Arbitrator::new(config),
            Err(ConfigError::InvalidParam { ref name, .. }) if name == "similarity_threshold"
        ));
    }

    #[test]
    fn identical_pair_collapses_at_highest_valid_threshold() {
        let config = ArbitratorConfig {
            similarity_threshold: 1.0 - 1e-12,
            ..ArbitratorConfig::default()
        };
        assert!(config.validate().is_ok());
        let weak = signal(1, Direction::Long, 100.0, 0.4, 0.7);
        let strong = signal(2, Direction::Long, 100.0, 0.8, 0.7);
        let (kept, dropped) = redundancy::suppress(
            vec![weak, strong],
            config.similarity_threshold,
            config.price_similarity_weight,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].playbook_id, PlaybookId(2));
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn arbitrate_does_not_touch_weights() {
        let arb = Arbitrator::new(ArbitratorConfig::default()).unwrap();
        let before = *arb.weights();
        let stats = StatsRegistry::default();
        let tracker = CorrelationTracker::new(50);
        let _ = arb.arbitrate(
            vec![signal(1, Direction::Long, 100.0, 0.5, 0.5)],
            &ctx(&stats, &tracker),
        );
        assert_eq!(*arb.weights(), before);
    }
}
