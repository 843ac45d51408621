//! Playbook parameter sets.
//!
//! Every numeric threshold a playbook uses lives here so that variants can be
//! tuned from configuration. The salvage coefficients and stop thresholds are
//! empirical; the defaults are starting points, not constants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::{PlaybookId, RegimeLabel};

/// One entry of the take-profit schedule, relative to 1R.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub r_multiple: f64,
    pub fraction: f64,
}

impl TargetSpec {
    pub fn new(r_multiple: f64, fraction: f64) -> Self {
        Self {
            r_multiple,
            fraction,
        }
    }
}

/// Entry confirmation from the order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroConfirmParams {
    pub enabled: bool,
    /// Direction-matched order-flow imbalance must reach this magnitude.
    pub min_ofi: f64,
    /// Direction-matched depth imbalance must reach this value.
    pub min_depth_imbalance: f64,
}

impl Default for MicroConfirmParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_ofi: 0.2,
            min_depth_imbalance: 0.0,
        }
    }
}

/// Three-phase stop policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopParams {
    /// MFE (R) at which phase 2 starts.
    pub t1: f64,
    /// MFE (R) at which phase 3 starts.
    pub t2: f64,
    /// Quantile of historical winner |MAE| used for the phase-1 distance.
    pub mae_quantile: f64,
    /// Winning trades required before the MAE quantile replaces the initial stop.
    pub mae_min_samples: usize,
    /// Bars on each side that confirm a swing pivot.
    pub pivot_span: usize,
    /// How far back to search for pivots.
    pub pivot_lookback: usize,
    pub pivot_buffer_atr: f64,
    /// Phase-3 distance behind the favorable extreme, in R.
    pub trail_distance_r: f64,
}

impl Default for StopParams {
    fn default() -> Self {
        Self {
            t1: 0.5,
            t2: 1.2,
            mae_quantile: 0.8,
            mae_min_samples: 10,
            pivot_span: 2,
            pivot_lookback: 20,
            pivot_buffer_atr: 0.25,
            trail_distance_r: 1.0,
        }
    }
}

/// Salvage exit: weighted retracement, staleness and velocity decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvageParams {
    /// Minimum MFE (R) before salvage is considered.
    pub min_mfe_r: f64,
    /// Salvage only fires within this many bars of the last MFE extension.
    pub window_bars: u32,
    pub retracement_weight: f64,
    pub staleness_weight: f64,
    pub velocity_weight: f64,
    pub velocity_lookback: usize,
    pub threshold: f64,
}

impl Default for SalvageParams {
    fn default() -> Self {
        Self {
            min_mfe_r: 0.5,
            window_bars: 6,
            retracement_weight: 0.6,
            staleness_weight: 0.2,
            velocity_weight: 0.2,
            velocity_lookback: 3,
            threshold: 0.6,
        }
    }
}

/// Order-flow driven exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFlowExitParams {
    pub enabled: bool,
    /// Minimum MFE (R) before order-flow exits are armed.
    pub min_mfe_r: f64,
    /// Adverse order-flow imbalance magnitude that triggers an exit.
    pub reversal_threshold: f64,
    pub exit_on_large_order: bool,
}

impl Default for OrderFlowExitParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_mfe_r: 0.3,
            reversal_threshold: 0.4,
            exit_on_large_order: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookParams {
    pub preferred_regimes: Vec<RegimeLabel>,
    /// Clarity above which the preferred-regime gate is waived.
    pub clarity_override: f64,
    pub min_strength: f64,
    /// Default stop distance when the setup does not supply one.
    pub initial_stop_atr: f64,
    /// Floor on the stop distance.
    pub min_stop_atr: f64,
    /// Same-direction open positions of this playbook closer than this are duplicates.
    pub duplicate_distance_atr: f64,
    pub max_bars_held: Option<u32>,
    pub targets: Vec<TargetSpec>,
    pub micro_confirm: MicroConfirmParams,
    pub stops: StopParams,
    pub salvage: SalvageParams,
    pub order_flow_exit: OrderFlowExitParams,
    /// Variant-specific setup parameters, looked up by name with defaults.
    pub setup: BTreeMap<String, f64>,
}

impl Default for PlaybookParams {
    fn default() -> Self {
        Self {
            preferred_regimes: Vec::new(),
            clarity_override: 0.9,
            min_strength: 0.2,
            initial_stop_atr: 1.5,
            min_stop_atr: 0.5,
            duplicate_distance_atr: 0.5,
            max_bars_held: None,
            targets: vec![
                TargetSpec::new(1.0, 0.33),
                TargetSpec::new(2.0, 0.33),
                TargetSpec::new(3.0, 0.34),
            ],
            micro_confirm: MicroConfirmParams::default(),
            stops: StopParams::default(),
            salvage: SalvageParams::default(),
            order_flow_exit: OrderFlowExitParams::default(),
            setup: BTreeMap::new(),
        }
    }
}

impl PlaybookParams {
    /// Named setup parameter, falling back to `default`.
    pub fn setup_param(&self, name: &str, default: f64) -> f64 {
        self.setup.get(name).copied().unwrap_or(default)
    }

    /// Named setup parameter as a bar count, falling back to `default`.
    pub fn setup_param_usize(&self, name: &str, default: usize) -> usize {
        self.setup
            .get(name)
            .copied()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    pub fn validate(&self, id: PlaybookId) -> Result<(), ConfigError> {
        let invalid = |name: &str, reason: String| ConfigError::InvalidParam {
            section: format!("playbook {id}"),
            name: name.to_string(),
            reason,
        };

        if self.stops.t1 < 0.0 || !self.stops.t1.is_finite() || !self.stops.t2.is_finite() {
            return Err(invalid("stops.t1", "phase thresholds must be finite and >= 0".into()));
        }
        if self.stops.t1 >= self.stops.t2 {
            return Err(ConfigError::StopThresholds {
                playbook: id,
                t1: self.stops.t1,
                t2: self.stops.t2,
            });
        }
        if !(self.stops.mae_quantile > 0.0 && self.stops.mae_quantile <= 1.0) {
            return Err(invalid("stops.mae_quantile", "must be in (0, 1]".into()));
        }
        if self.stops.pivot_span == 0 {
            return Err(invalid("stops.pivot_span", "must be >= 1".into()));
        }
        for (name, value) in [
            ("stops.pivot_buffer_atr", self.stops.pivot_buffer_atr),
            ("stops.trail_distance_r", self.stops.trail_distance_r),
            ("initial_stop_atr", self.initial_stop_atr),
            ("min_stop_atr", self.min_stop_atr),
            ("duplicate_distance_atr", self.duplicate_distance_atr),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("must be finite and >= 0, got {value}")));
            }
        }
        if self.initial_stop_atr <= 0.0 {
            return Err(invalid("initial_stop_atr", "must be > 0".into()));
        }
        if self.stops.trail_distance_r <= 0.0 {
            return Err(invalid("stops.trail_distance_r", "must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(invalid("min_strength", "must be in [0, 1]".into()));
        }
        if !self.clarity_override.is_finite() || self.clarity_override < 0.0 {
            return Err(invalid("clarity_override", "must be finite and >= 0".into()));
        }

        let s = &self.salvage;
        for (name, value) in [
            ("salvage.retracement_weight", s.retracement_weight),
            ("salvage.staleness_weight", s.staleness_weight),
            ("salvage.velocity_weight", s.velocity_weight),
            ("salvage.threshold", s.threshold),
            ("salvage.min_mfe_r", s.min_mfe_r),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("must be finite and >= 0, got {value}")));
            }
        }
        if s.velocity_lookback == 0 {
            return Err(invalid("salvage.velocity_lookback", "must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.order_flow_exit.reversal_threshold) {
            return Err(invalid(
                "order_flow_exit.reversal_threshold",
                "must be in [0, 1]".into(),
            ));
        }

        self.validate_targets(id)
    }

    fn validate_targets(&self, id: PlaybookId) -> Result<(), ConfigError> {
        let schedule_error = |reason: String| ConfigError::TargetSchedule {
            playbook: id,
            reason,
        };
        if self.targets.is_empty() {
            return Err(schedule_error("schedule is empty".into()));
        }
        let mut prev_r = 0.0;
        let mut total = 0.0;
        for (i, target) in self.targets.iter().enumerate() {
            if !target.fraction.is_finite() || target.fraction <= 0.0 {
                return Err(schedule_error(format!("target {i} fraction must be > 0")));
            }
            if !target.r_multiple.is_finite() || target.r_multiple <= prev_r {
                return Err(schedule_error(format!(
                    "target {i} R-multiple must exceed {prev_r}"
                )));
            }
            prev_r = target.r_multiple;
            total += target.fraction;
        }
        if (total - 1.0).abs() > 1e-9 {
            return Err(schedule_error(format!("fractions sum to {total}, expected 1.0")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PlaybookParams::default().validate(PlaybookId(1)).is_ok());
    }

    #[test]
    fn t1_must_be_below_t2() {
        let mut p = PlaybookParams::default();
        p.stops.t1 = 1.5;
        p.stops.t2 = 1.2;
        assert!(matches!(
            p.validate(PlaybookId(1)),
            Err(ConfigError::StopThresholds { .. })
        ));
    }

    #[test]
    fn target_fractions_must_sum_to_one() {
        let mut p = PlaybookParams::default();
        p.targets = vec![TargetSpec::new(1.0, 0.5), TargetSpec::new(2.0, 0.4)];
        assert!(matches!(
            p.validate(PlaybookId(1)),
            Err(ConfigError::TargetSchedule { .. })
        ));
    }

    #[test]
    fn target_r_multiples_must_increase() {
        let mut p = PlaybookParams::default();
        p.targets = vec![TargetSpec::new(2.0, 0.5), TargetSpec::new(1.0, 0.5)];
        assert!(p.validate(PlaybookId(1)).is_err());
    }

    #[test]
    fn setup_param_falls_back() {
        let mut p = PlaybookParams::default();
        p.setup.insert("lookback".into(), 15.0);
        assert_eq!(p.setup_param_usize("lookback", 20), 15);
        assert_eq!(p.setup_param("missing", 0.7), 0.7);
    }
}
