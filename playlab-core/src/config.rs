//! Core configuration and construction-time validation.
//!
//! `CoreConfig` is a serde tree loadable from TOML or JSON. Every section has
//! a `Default` except the regime model, which must come from an offline fit.
//! `validate()` is the single gate: `DecisionCore::new` refuses to build on
//! any error.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::arbitration::ArbitratorConfig;
use crate::domain::PlaybookId;
use crate::features::FeatureConfig;
use crate::microstructure::MicrostructureConfig;
use crate::playbook::{PlaybookConfig, PlaybookKind};
use crate::regime::RegimeModel;
use crate::sizing::SizingConfig;

// ─── Error type ──────────────────────────────────────────────────────

/// Configuration mistakes. Fatal at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {section}.{name}: {reason}")]
    InvalidParam {
        section: String,
        name: String,
        reason: String,
    },
    #[error("playbook {playbook}: phase-1 threshold ({t1}) must be below phase-2 threshold ({t2})")]
    StopThresholds { playbook: PlaybookId, t1: f64, t2: f64 },
    #[error("playbook {playbook}: bad target schedule: {reason}")]
    TargetSchedule { playbook: PlaybookId, reason: String },
    #[error("duplicate playbook id {0}")]
    DuplicatePlaybook(PlaybookId),
    #[error("at least one playbook must be configured")]
    NoPlaybooks,
    #[error("regime model: {0}")]
    RegimeModel(String),
    #[error("arbitration weights: {0}")]
    Weights(String),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

// ─── Lifecycle limits ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub max_open_positions: usize,
    /// Nearest-snapshot lookup tolerance used by the driver.
    pub snapshot_tolerance_ms: i64,
    /// Positions open at or after this time exit at the close; no entries.
    pub session_close: Option<NaiveTime>,
    /// Closed trades in a regime before the stats filter may bench a playbook.
    pub regime_filter_min_trades: usize,
    /// Expectancy (R) below which a sampled playbook is benched in that regime.
    pub regime_filter_floor_r: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_open_positions: 4,
            snapshot_tolerance_ms: 1_000,
            session_close: None,
            regime_filter_min_trades: 10,
            regime_filter_floor_r: -0.25,
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_positions == 0 {
            return Err(lifecycle("max_open_positions", "must be >= 1".into()));
        }
        if self.snapshot_tolerance_ms < 0 {
            return Err(lifecycle(
                "snapshot_tolerance_ms",
                format!("must be >= 0, got {}", self.snapshot_tolerance_ms),
            ));
        }
        if !self.regime_filter_floor_r.is_finite() {
            return Err(lifecycle("regime_filter_floor_r", "must be finite".into()));
        }
        Ok(())
    }

    pub fn snapshot_tolerance(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.snapshot_tolerance_ms)
    }
}

fn lifecycle(name: &str, reason: String) -> ConfigError {
    ConfigError::InvalidParam {
        section: "lifecycle".into(),
        name: name.into(),
        reason,
    }
}

// ─── Core configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub microstructure: MicrostructureConfig,
    pub regime_model: RegimeModel,
    #[serde(default = "default_playbooks")]
    pub playbooks: Vec<PlaybookConfig>,
    #[serde(default)]
    pub arbitrator: ArbitratorConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// One playbook of each kind, ids 1..=4.
pub fn default_playbooks() -> Vec<PlaybookConfig> {
    PlaybookKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| PlaybookConfig::new(i as u32 + 1, *kind))
        .collect()
}

impl CoreConfig {
    /// Defaults everywhere around a fitted regime model.
    pub fn new(regime_model: RegimeModel) -> Self {
        Self {
            features: FeatureConfig::default(),
            microstructure: MicrostructureConfig::default(),
            regime_model,
            playbooks: default_playbooks(),
            arbitrator: ArbitratorConfig::default(),
            sizing: SizingConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every section. Returns the first error found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features.validate()?;
        self.microstructure.validate()?;
        self.regime_model.validate()?;
        if self.playbooks.is_empty() {
            return Err(ConfigError::NoPlaybooks);
        }
        let mut seen = std::collections::BTreeSet::new();
        for pb in &self.playbooks {
            if !seen.insert(pb.id) {
                return Err(ConfigError::DuplicatePlaybook(pb.id));
            }
            pb.effective_params().validate(pb.id)?;
        }
        self.arbitrator.validate()?;
        self.sizing.validate()?;
        self.lifecycle.validate()?;
        Ok(())
    }

    /// BLAKE3 over the canonical JSON form. Identifies a configuration in
    /// replay fingerprints.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::reference_regime_model;

    fn config() -> CoreConfig {
        CoreConfig::new(reference_regime_model())
    }

    #[test]
    fn defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn json_round_trip_preserves_hash() {
        let cfg = config();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = CoreConfig::from_json_str(&json).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.config_hash().unwrap(), cfg.config_hash().unwrap());
    }

    #[test]
    fn hash_changes_with_parameters() {
        let a = config();
        let mut b = config();
        b.sizing.heat_ceiling = 0.04;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }

    #[test]
    fn toml_sections_are_optional() {
        #[derive(Serialize)]
        struct ModelOnly {
            regime_model: RegimeModel,
        }
        let model = toml::to_string(&ModelOnly {
            regime_model: reference_regime_model(),
        })
        .unwrap();
        let text = format!("[lifecycle]\nmax_open_positions = 2\nsession_close = \"15:55:00\"\n\n{model}");
        let cfg = CoreConfig::from_toml_str(&text).unwrap();
        assert_eq!(cfg.lifecycle.max_open_positions, 2);
        assert_eq!(cfg.lifecycle.session_close, NaiveTime::from_hms_opt(15, 55, 0));
        assert_eq!(cfg.playbooks.len(), 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn stop_thresholds_out_of_order_rejected() {
        let mut cfg = config();
        let mut params = PlaybookKind::TrendContinuation.default_params();
        params.stops.t1 = 1.5;
        params.stops.t2 = 1.0;
        cfg.playbooks[0] = PlaybookConfig::new(1, PlaybookKind::TrendContinuation).with_params(params);
        assert!(matches!(cfg.validate(), Err(ConfigError::StopThresholds { .. })));
    }

    #[test]
    fn zero_position_ceiling_rejected() {
        let mut cfg = config();
        cfg.lifecycle.max_open_positions = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidParam { .. })));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut cfg = config();
        cfg.playbooks[1].id = PlaybookId(1);
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicatePlaybook(PlaybookId(1))));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(matches!(CoreConfig::from_toml_str("[[["), Err(ConfigError::Parse(_))));
    }
}
