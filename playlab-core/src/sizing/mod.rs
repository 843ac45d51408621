//! Portfolio sizing under a heat ceiling.
//!
//! # Formula
//! ```text
//! raw   = base_risk × vol × corr × clarity × concentration
//! vol           = target_vol / realized_vol
//! corr          = 1 − avg |ρ| to same-direction open positions × corr_weight
//! clarity       = floor_mult at clarity_low → 1.0 at clarity_high, linear
//! concentration = 1 − step × (n − threshold + 1) once n ≥ threshold
//! size  = min(raw, heat_ceiling − open heat)
//! ```
//! Each multiplier is clamped to `[multiplier_min, multiplier_max]`.

pub mod correlation;

pub use correlation::CorrelationTracker;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::domain::{Direction, Position, RegimeAssignment, Signal};
use crate::features::FeatureSnapshot;
use crate::numeric::{mean, EPSILON};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// At-risk capital fraction before adjustments.
    pub base_risk: f64,
    /// Per-bar realized volatility the volatility multiplier aims for.
    pub target_vol: f64,
    pub multiplier_min: f64,
    pub multiplier_max: f64,
    pub correlation_weight: f64,
    pub clarity_high: f64,
    pub clarity_low: f64,
    pub clarity_floor_multiplier: f64,
    /// Same-direction open positions at which the concentration cut starts.
    pub concentration_threshold: usize,
    pub concentration_step: f64,
    /// Maximum total heat across open positions.
    pub heat_ceiling: f64,
    /// Smallest size worth admitting.
    pub min_size: f64,
    /// Bars kept by the correlation tracker.
    pub correlation_window: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_risk: 0.01,
            target_vol: 0.002,
            multiplier_min: 0.3,
            multiplier_max: 2.0,
            correlation_weight: 0.4,
            clarity_high: 0.75,
            clarity_low: 0.4,
            clarity_floor_multiplier: 0.55,
            concentration_threshold: 3,
            concentration_step: 0.2,
            heat_ceiling: 0.05,
            min_size: 0.0005,
            correlation_window: 50,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f64| v > 0.0 && v <= 1.0;
        if !in_unit(self.base_risk) {
            return Err(invalid("base_risk", format!("must be in (0, 1], got {}", self.base_risk)));
        }
        if !in_unit(self.heat_ceiling) {
            return Err(invalid("heat_ceiling", format!("must be in (0, 1], got {}", self.heat_ceiling)));
        }
        if !(self.target_vol > 0.0) {
            return Err(invalid("target_vol", format!("must be > 0, got {}", self.target_vol)));
        }
        if !(self.multiplier_min > 0.0) || self.multiplier_min > self.multiplier_max {
            return Err(invalid(
                "multiplier_min",
                format!(
                    "need 0 < multiplier_min ({}) <= multiplier_max ({})",
                    self.multiplier_min, self.multiplier_max
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.correlation_weight) {
            return Err(invalid("correlation_weight", format!("must be in [0, 1], got {}", self.correlation_weight)));
        }
        if !(0.0 <= self.clarity_low && self.clarity_low < self.clarity_high && self.clarity_high <= 1.0) {
            return Err(invalid(
                "clarity_low",
                format!("need 0 <= clarity_low ({}) < clarity_high ({}) <= 1", self.clarity_low, self.clarity_high),
            ));
        }
        if !in_unit(self.clarity_floor_multiplier) {
            return Err(invalid(
                "clarity_floor_multiplier",
                format!("must be in (0, 1], got {}", self.clarity_floor_multiplier),
            ));
        }
        if self.concentration_threshold == 0 || !(self.concentration_step >= 0.0) {
            return Err(invalid("concentration_threshold", "threshold must be >= 1 and step >= 0".into()));
        }
        if !(self.min_size >= 0.0) || self.min_size >= self.heat_ceiling {
            return Err(invalid("min_size", format!("must be in [0, heat_ceiling), got {}", self.min_size)));
        }
        if self.correlation_window < 2 {
            return Err(invalid("correlation_window", "must be >= 2".into()));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: String) -> ConfigError {
    ConfigError::InvalidParam {
        section: "sizing".into(),
        name: name.into(),
        reason,
    }
}

/// Final size and the adjustments that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub size: f64,
    pub raw_size: f64,
    pub volatility: f64,
    pub correlation: f64,
    pub clarity: f64,
    pub concentration: f64,
    /// True when the heat ceiling cut the raw size.
    pub heat_capped: bool,
}

/// Total heat of a set of open positions.
pub fn open_heat(positions: &[Position]) -> f64 {
    positions.iter().map(Position::heat).sum()
}

#[derive(Debug, Clone)]
pub struct SizingManager {
    config: SizingConfig,
}

impl SizingManager {
    pub fn new(config: SizingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Size a selected signal. `None` when the result would fall below
    /// `min_size`, including when no heat headroom is left.
    pub fn size(
        &self,
        signal: &Signal,
        regime: &RegimeAssignment,
        features: &FeatureSnapshot,
        open_positions: &[Position],
        correlations: &CorrelationTracker,
    ) -> Option<SizingDecision> {
        let cfg = &self.config;
        let volatility = self.clamp(self.volatility_multiplier(features.realized_vol));
        let correlation = self.clamp(self.correlation_multiplier(signal, open_positions, correlations));
        let clarity = self.clamp(self.clarity_multiplier(regime.clarity));
        let same_side = same_direction_count(signal.direction, open_positions);
        let concentration = self.clamp(self.concentration_multiplier(same_side));

        let raw_size = cfg.base_risk * volatility * correlation * clarity * concentration;
        let headroom = cfg.heat_ceiling - open_heat(open_positions);
        if headroom < cfg.min_size {
            debug!(playbook = %signal.playbook_id, headroom, "no heat headroom, entry skipped");
            return None;
        }
        let heat_capped = raw_size > headroom;
        let size = if heat_capped { headroom } else { raw_size };
        if heat_capped {
            warn!(
                playbook = %signal.playbook_id,
                raw_size,
                size,
                ceiling = cfg.heat_ceiling,
                "size capped by heat ceiling"
            );
        }
        if !size.is_finite() || size < cfg.min_size {
            return None;
        }
        Some(SizingDecision {
            size,
            raw_size,
            volatility,
            correlation,
            clarity,
            concentration,
            heat_capped,
        })
    }

    // ─── Multipliers ─────────────────────────────────────────────────

    fn clamp(&self, m: f64) -> f64 {
        if !m.is_finite() {
            return 1.0_f64.clamp(self.config.multiplier_min, self.config.multiplier_max);
        }
        m.clamp(self.config.multiplier_min, self.config.multiplier_max)
    }

    fn volatility_multiplier(&self, realized_vol: Option<f64>) -> f64 {
        match realized_vol {
            Some(v) if v > EPSILON => self.config.target_vol / v,
            _ => 1.0,
        }
    }

    fn correlation_multiplier(
        &self,
        signal: &Signal,
        open_positions: &[Position],
        correlations: &CorrelationTracker,
    ) -> f64 {
        let abs: Vec<f64> = open_positions
            .iter()
            .filter(|p| p.direction == signal.direction)
            .map(|p| {
                correlations
                    .correlation((signal.playbook_id, signal.direction), (p.playbook_id, p.direction))
                    .abs()
            })
            .collect();
        match mean(&abs) {
            Some(avg) => 1.0 - avg * self.config.correlation_weight,
            None => 1.0,
        }
    }

    fn clarity_multiplier(&self, clarity: f64) -> f64 {
        let cfg = &self.config;
        if clarity >= cfg.clarity_high {
            1.0
        } else if clarity <= cfg.clarity_low {
            cfg.clarity_floor_multiplier
        } else {
            let t = (clarity - cfg.clarity_low) / (cfg.clarity_high - cfg.clarity_low);
            cfg.clarity_floor_multiplier + t * (1.0 - cfg.clarity_floor_multiplier)
        }
    }

    fn concentration_multiplier(&self, same_side: usize) -> f64 {
        let cfg = &self.config;
        if same_side < cfg.concentration_threshold {
            return 1.0;
        }
        let over = (same_side - cfg.concentration_threshold + 1) as f64;
        1.0 - cfg.concentration_step * over
    }
}

fn same_direction_count(direction: Direction, positions: &[Position]) -> usize {
    positions.iter().filter(|p| p.direction == direction).count()
}
