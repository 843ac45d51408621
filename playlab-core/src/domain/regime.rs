//! Regime labels and the per-bar regime assignment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical market regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeLabel {
    Trend,
    Range,
    Volatile,
    Transitional,
}

impl RegimeLabel {
    pub const COUNT: usize = 4;

    pub const ALL: [RegimeLabel; RegimeLabel::COUNT] = [
        RegimeLabel::Trend,
        RegimeLabel::Range,
        RegimeLabel::Volatile,
        RegimeLabel::Transitional,
    ];

    /// Index into a label probability vector.
    pub fn index(self) -> usize {
        match self {
            RegimeLabel::Trend => 0,
            RegimeLabel::Range => 1,
            RegimeLabel::Volatile => 2,
            RegimeLabel::Transitional => 3,
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegimeLabel::Trend => "TREND",
            RegimeLabel::Range => "RANGE",
            RegimeLabel::Volatile => "VOLATILE",
            RegimeLabel::Transitional => "TRANSITIONAL",
        };
        f.write_str(s)
    }
}

/// Classifier output for one bar. Recomputed every bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssignment {
    pub label: RegimeLabel,
    /// Posterior probability per label, indexed by [`RegimeLabel::index`].
    pub probabilities: [f64; RegimeLabel::COUNT],
    /// Winning posterior.
    pub clarity: f64,
    /// False when the feature vector was not usable; dependent checks fail closed.
    pub usable: bool,
}

impl RegimeAssignment {
    /// Build an assignment from label probabilities. Ties go to the earlier label.
    pub fn from_probabilities(probabilities: [f64; RegimeLabel::COUNT]) -> Self {
        let mut best = RegimeLabel::Trend;
        for label in RegimeLabel::ALL {
            if probabilities[label.index()] > probabilities[best.index()] {
                best = label;
            }
        }
        Self {
            label: best,
            probabilities,
            clarity: probabilities[best.index()],
            usable: true,
        }
    }

    /// Assignment used when features are not usable.
    pub fn undetermined() -> Self {
        let uniform = 1.0 / RegimeLabel::COUNT as f64;
        Self {
            label: RegimeLabel::Transitional,
            probabilities: [uniform; RegimeLabel::COUNT],
            clarity: uniform,
            usable: false,
        }
    }

    pub fn probability(&self, label: RegimeLabel) -> f64 {
        self.probabilities[label.index()]
    }

    /// Total posterior mass on a set of labels.
    pub fn probability_of(&self, labels: &[RegimeLabel]) -> f64 {
        let mut seen = [false; RegimeLabel::COUNT];
        let mut total = 0.0;
        for label in labels {
            if !seen[label.index()] {
                seen[label.index()] = true;
                total += self.probability(*label);
            }
        }
        total.clamp(0.0, 1.0)
    }
}
