//! Cluster → regime label mapping by majority vote.

use playlab_core::domain::RegimeLabel;
use playlab_core::features::{FeatureSnapshot, FEATURE_DIM};
use playlab_core::regime::{RegimeClassifier, RegimeModel};
use tracing::debug;

use super::FitError;

/// Index of the most probable cluster for `x`.
pub fn dominant_cluster(classifier: &RegimeClassifier, x: &[f64]) -> Option<usize> {
    let posteriors = classifier.cluster_posteriors(x)?;
    let mut best = 0;
    for (i, p) in posteriors.iter().enumerate() {
        if *p > posteriors[best] {
            best = i;
        }
    }
    Some(best)
}

/// Label each cluster with the most common tag among the validation vectors
/// it wins. Vote ties go to the earlier label; clusters that win no vectors
/// become TRANSITIONAL.
pub fn map_clusters(
    model: &RegimeModel,
    validation: &[([f64; FEATURE_DIM], RegimeLabel)],
) -> Result<Vec<RegimeLabel>, FitError> {
    let clusters = model.components.len();
    let mut unlabelled = model.clone();
    unlabelled.cluster_labels = vec![RegimeLabel::Transitional; clusters];
    let classifier = RegimeClassifier::new(unlabelled)?;

    let mut votes = vec![[0usize; RegimeLabel::COUNT]; clusters];
    for (x, label) in validation {
        if let Some(c) = dominant_cluster(&classifier, x) {
            votes[c][label.index()] += 1;
        }
    }

    let labels = votes
        .iter()
        .enumerate()
        .map(|(c, tally)| {
            let mut best = RegimeLabel::Transitional;
            let mut best_votes = 0;
            for label in RegimeLabel::ALL {
                if tally[label.index()] > best_votes {
                    best = label;
                    best_votes = tally[label.index()];
                }
            }
            debug!(cluster = c, label = %best, votes = best_votes, "cluster labelled");
            best
        })
        .collect();
    Ok(labels)
}

/// Classify a raw feature vector through the full classifier path.
pub fn classify_vector(classifier: &RegimeClassifier, x: &[f64; FEATURE_DIM]) -> RegimeLabel {
    classifier.classify(&snapshot_of(x)).label
}

/// Share of `validation` whose classified label equals its tag. `None` when
/// there is nothing to score.
pub fn accuracy(
    classifier: &RegimeClassifier,
    validation: &[([f64; FEATURE_DIM], RegimeLabel)],
) -> Option<f64> {
    if validation.is_empty() {
        return None;
    }
    let hits = validation
        .iter()
        .filter(|(x, label)| classify_vector(classifier, x) == *label)
        .count();
    Some(hits as f64 / validation.len() as f64)
}

/// Feature snapshot carrying only the classifier inputs.
pub fn snapshot_of(x: &[f64; FEATURE_DIM]) -> FeatureSnapshot {
    FeatureSnapshot {
        volatility_ratio: Some(x[0]),
        path_entropy: Some(x[1]),
        participation: Some(x[2]),
        directional_commitment: Some(x[3]),
        liquidity_score: Some(x[4]),
        ..FeatureSnapshot::unusable(chrono::NaiveDateTime::default())
    }
}
