//! Playbook registry and factory.
//!
//! Configs name a variant by [`PlaybookKind`] and carry an optional parameter
//! override; `create_playbook` turns one into a boxed trait object. The
//! registry maps id → implementation and is iterated in ascending id order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::PlaybookId;

use super::params::PlaybookParams;
use super::variants::{RangeReversion, TransitionBreakout, TrendContinuation, VolatilityExpansion};
use super::Playbook;

/// Available playbook variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookKind {
    TrendContinuation,
    RangeReversion,
    VolatilityExpansion,
    TransitionBreakout,
}

impl PlaybookKind {
    pub const ALL: [PlaybookKind; 4] = [
        PlaybookKind::TrendContinuation,
        PlaybookKind::RangeReversion,
        PlaybookKind::VolatilityExpansion,
        PlaybookKind::TransitionBreakout,
    ];

    /// The variant's tuned defaults.
    pub fn default_params(self) -> PlaybookParams {
        match self {
            PlaybookKind::TrendContinuation => TrendContinuation::default_params(),
            PlaybookKind::RangeReversion => RangeReversion::default_params(),
            PlaybookKind::VolatilityExpansion => VolatilityExpansion::default_params(),
            PlaybookKind::TransitionBreakout => TransitionBreakout::default_params(),
        }
    }
}

/// One configured playbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookConfig {
    pub id: PlaybookId,
    pub kind: PlaybookKind,
    /// Full parameter set; the variant defaults apply when absent.
    #[serde(default)]
    pub params: Option<PlaybookParams>,
}

impl PlaybookConfig {
    pub fn new(id: u32, kind: PlaybookKind) -> Self {
        Self {
            id: PlaybookId(id),
            kind,
            params: None,
        }
    }

    pub fn with_params(mut self, params: PlaybookParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn effective_params(&self) -> PlaybookParams {
        self.params
            .clone()
            .unwrap_or_else(|| self.kind.default_params())
    }
}

/// Build a playbook from its config.
pub fn create_playbook(config: &PlaybookConfig) -> Box<dyn Playbook> {
    let params = config.effective_params();
    match config.kind {
        PlaybookKind::TrendContinuation => Box::new(TrendContinuation::new(config.id, params)),
        PlaybookKind::RangeReversion => Box::new(RangeReversion::new(config.id, params)),
        PlaybookKind::VolatilityExpansion => Box::new(VolatilityExpansion::new(config.id, params)),
        PlaybookKind::TransitionBreakout => Box::new(TransitionBreakout::new(config.id, params)),
    }
}

/// id → playbook. Iteration is in ascending id order.
#[derive(Default)]
pub struct PlaybookRegistry {
    playbooks: BTreeMap<PlaybookId, Box<dyn Playbook>>,
}

impl PlaybookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every config and build the registry.
    pub fn from_configs(configs: &[PlaybookConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::NoPlaybooks);
        }
        let mut registry = Self::new();
        for config in configs {
            config.effective_params().validate(config.id)?;
            registry.register(create_playbook(config))?;
        }
        Ok(registry)
    }

    /// Add a playbook. Ids must be unique.
    pub fn register(&mut self, playbook: Box<dyn Playbook>) -> Result<(), ConfigError> {
        let id = playbook.id();
        if self.playbooks.contains_key(&id) {
            return Err(ConfigError::DuplicatePlaybook(id));
        }
        self.playbooks.insert(id, playbook);
        Ok(())
    }

    pub fn get(&self, id: PlaybookId) -> Option<&dyn Playbook> {
        self.playbooks.get(&id).map(|p| p.as_ref())
    }

    pub fn contains(&self, id: PlaybookId) -> bool {
        self.playbooks.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<PlaybookId> {
        self.playbooks.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Playbook> {
        self.playbooks.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.playbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }
}

impl fmt::Debug for PlaybookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.playbooks.iter().map(|(id, p)| (id, p.name())))
            .finish()
    }
}
