//! Signal: a candidate entry raised by a playbook.
//!
//! Signals are immutable once raised. The arbitrator either discards one or
//! the lifecycle manager promotes it to a position; nothing edits it in place.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ids::PlaybookId;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn from_sign(value: f64) -> Option<Self> {
        if value > 0.0 {
            Some(Direction::Long)
        } else if value < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

/// One step of the take-profit schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitTarget {
    pub price: f64,
    /// Fraction of the original size closed at this target.
    pub fraction: f64,
    /// Distance from entry in risk multiples.
    pub r_multiple: f64,
}

/// Candidate entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub playbook_id: PlaybookId,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub reference_price: f64,
    pub initial_stop: f64,
    /// Ordered take-profit schedule; fractions sum to 1.0.
    pub targets: Vec<ProfitTarget>,
    /// Setup conviction in [0, 1].
    pub strength: f64,
    /// Posterior mass of the playbook's preferred regimes, in [0, 1].
    pub regime_alignment: f64,
}

impl Signal {
    /// Initial stop distance in price (1R).
    pub fn risk(&self) -> f64 {
        (self.reference_price - self.initial_stop).abs()
    }

    /// Fraction-weighted R of the target schedule.
    pub fn scheduled_r(&self) -> f64 {
        self.targets.iter().map(|t| t.fraction * t.r_multiple).sum()
    }
}
