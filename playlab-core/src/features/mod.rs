//! Feature Engine: per-bar statistical descriptors from a trailing window.
//!
//! `FeatureEngine::compute` is a pure function of (history, current bar).
//! Every descriptor is an `Option<f64>`: `None` is the "not usable" sentinel
//! for insufficient history. Degenerate input (zero volume, zero range, flat
//! prices) yields neutral values instead of dividing by zero.
//!
//! Descriptors:
//! - volatility ratio: fast realized vol / slow realized vol
//! - path entropy: normalized Shannon entropy of up/down transition pairs
//! - participation: z-score of current volume against the window
//! - directional commitment: net / gross close change, in [-1, 1]
//! - liquidity score: relative volume blended with relative bar tightness
//!
//! plus `atr` and `realized_vol`, used by playbooks and sizing.

pub mod commitment;
pub mod entropy;
pub mod liquidity;
pub mod participation;
pub mod volatility;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Bar;

/// Number of descriptors fed to the regime classifier.
pub const FEATURE_DIM: usize = 5;

/// Classifier input names, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "volatility_ratio",
    "path_entropy",
    "participation",
    "directional_commitment",
    "liquidity_score",
];

/// Window lengths, in bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub fast_window: usize,
    pub slow_window: usize,
    pub entropy_window: usize,
    pub participation_window: usize,
    pub commitment_window: usize,
    pub liquidity_window: usize,
    pub atr_period: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_window: 5,
            slow_window: 30,
            entropy_window: 20,
            participation_window: 20,
            commitment_window: 12,
            liquidity_window: 20,
            atr_period: 14,
        }
    }
}

impl FeatureConfig {
    /// Bars of history (excluding the current bar) needed for every descriptor.
    pub fn required_history(&self) -> usize {
        [
            self.slow_window,
            self.entropy_window,
            self.participation_window,
            self.commitment_window,
            self.liquidity_window,
            self.atr_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("fast_window", self.fast_window),
            ("slow_window", self.slow_window),
            ("entropy_window", self.entropy_window),
            ("participation_window", self.participation_window),
            ("commitment_window", self.commitment_window),
            ("liquidity_window", self.liquidity_window),
            ("atr_period", self.atr_period),
        ];
        for (name, value) in windows {
            if value < 2 {
                return Err(ConfigError::InvalidParam {
                    section: "features".into(),
                    name: name.into(),
                    reason: format!("window must be >= 2, got {value}"),
                });
            }
        }
        if self.fast_window >= self.slow_window {
            return Err(ConfigError::InvalidParam {
                section: "features".into(),
                name: "fast_window".into(),
                reason: format!(
                    "fast window ({}) must be shorter than slow window ({})",
                    self.fast_window, self.slow_window
                ),
            });
        }
        Ok(())
    }
}

/// Descriptors for one bar. Consumed, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub timestamp: NaiveDateTime,
    pub volatility_ratio: Option<f64>,
    pub path_entropy: Option<f64>,
    pub participation: Option<f64>,
    pub directional_commitment: Option<f64>,
    pub liquidity_score: Option<f64>,
    pub atr: Option<f64>,
    pub realized_vol: Option<f64>,
}

impl FeatureSnapshot {
    /// Snapshot with every descriptor marked not usable.
    pub fn unusable(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            volatility_ratio: None,
            path_entropy: None,
            participation: None,
            directional_commitment: None,
            liquidity_score: None,
            atr: None,
            realized_vol: None,
        }
    }

    /// The classifier inputs in [`FEATURE_NAMES`] order, or `None` if any is
    /// not usable.
    pub fn vector(&self) -> Option<[f64; FEATURE_DIM]> {
        Some([
            self.volatility_ratio?,
            self.path_entropy?,
            self.participation?,
            self.directional_commitment?,
            self.liquidity_score?,
        ])
    }

    pub fn is_usable(&self) -> bool {
        self.vector().is_some()
    }
}

/// Stateless descriptor calculator.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Compute descriptors for `current` given the bars strictly before it.
    ///
    /// A trailing history bar carrying the current timestamp is ignored.
    pub fn compute(&self, history: &[Bar], current: &Bar) -> FeatureSnapshot {
        let history = match history.last() {
            Some(last) if last.timestamp >= current.timestamp => &history[..history.len() - 1],
            _ => history,
        };
        let keep = self.config.required_history().min(history.len());
        let mut window: Vec<Bar> = Vec::with_capacity(keep + 1);
        window.extend_from_slice(&history[history.len() - keep..]);
        window.push(*current);

        let cfg = &self.config;
        FeatureSnapshot {
            timestamp: current.timestamp,
            volatility_ratio: volatility::volatility_ratio(&window, cfg.fast_window, cfg.slow_window),
            path_entropy: entropy::path_entropy(&window, cfg.entropy_window),
            participation: participation::volume_zscore(&window, cfg.participation_window),
            directional_commitment: commitment::directional_commitment(
                &window,
                cfg.commitment_window,
            ),
            liquidity_score: liquidity::liquidity_score(&window, cfg.liquidity_window),
            atr: volatility::atr(&window, cfg.atr_period),
            realized_vol: volatility::realized_vol(&window, cfg.slow_window),
        }
    }
}

/// Synthetic bars from close prices for tests.
///
/// open = prev close, high/low = max/min(open, close) ± 1.0, volume = 1000,
/// one bar per minute from 09:30.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}
