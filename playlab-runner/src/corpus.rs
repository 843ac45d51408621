//! Feature corpus extraction from historical bars.
//!
//! Runs the core's feature engine over a bar tape exactly as the live path
//! does and keeps the bars whose classifier inputs are all usable.

use chrono::NaiveDateTime;
use playlab_core::domain::{Bar, RegimeLabel};
use playlab_core::features::{FeatureConfig, FeatureEngine, FEATURE_DIM};
use tracing::debug;

use crate::fit::FitError;

/// Usable classifier inputs with the bar each came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCorpus {
    pub rows: Vec<[f64; FEATURE_DIM]>,
    pub timestamps: Vec<NaiveDateTime>,
}

impl FeatureCorpus {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn extract(bars: &[Bar], config: &FeatureConfig) -> FeatureCorpus {
    let engine = FeatureEngine::new(config.clone());
    let mut corpus = FeatureCorpus::default();
    for (i, bar) in bars.iter().enumerate() {
        if let Some(x) = engine.compute(&bars[..i], bar).vector() {
            corpus.rows.push(x);
            corpus.timestamps.push(bar.timestamp);
        }
    }
    debug!(bars = bars.len(), usable = corpus.len(), "corpus extracted");
    corpus
}

/// Like [`extract`], pairing each usable vector with the tag of its bar.
pub fn extract_labelled(
    bars: &[Bar],
    labels: &[RegimeLabel],
    config: &FeatureConfig,
) -> Result<Vec<([f64; FEATURE_DIM], RegimeLabel)>, FitError> {
    if bars.len() != labels.len() {
        return Err(FitError::LabelMismatch {
            bars: bars.len(),
            labels: labels.len(),
        });
    }
    let engine = FeatureEngine::new(config.clone());
    Ok(bars
        .iter()
        .zip(labels.iter())
        .enumerate()
        .filter_map(|(i, (bar, label))| engine.compute(&bars[..i], bar).vector().map(|x| (x, *label)))
        .collect())
}
