//! Per-playbook running statistics.
//!
//! Updated once per closed trade (and once per scored signal for the strength
//! history). Feeds the arbitrator's hour/efficiency/strength factors, the
//! phase-1 stop distance and the regime filter.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::{ClosedTrade, PlaybookId, RegimeLabel};
use crate::numeric::EPSILON;

/// Strength samples kept per playbook.
pub const STRENGTH_HISTORY_CAP: usize = 500;
/// Winner |MAE| samples kept per playbook.
pub const WINNER_MAE_CAP: usize = 500;

/// Count / wins / cumulative R for a slice of trades.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub count: usize,
    pub wins: usize,
    pub cumulative_r: f64,
}

impl OutcomeTally {
    pub fn record(&mut self, realized_r: f64) {
        self.count += 1;
        if realized_r > 0.0 {
            self.wins += 1;
        }
        self.cumulative_r += realized_r;
    }

    /// Mean R per trade.
    pub fn expectancy(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.cumulative_r / self.count as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybookStats {
    pub trade_count: usize,
    pub wins: usize,
    pub cumulative_r: f64,
    pub total_bars_held: u64,
    /// |MAE| in R of winning trades, most recent last.
    pub winner_mae: VecDeque<f64>,
    /// Outcomes keyed by entry hour of day.
    pub by_hour: BTreeMap<u32, OutcomeTally>,
    /// Outcomes keyed by regime at entry.
    pub by_regime: BTreeMap<RegimeLabel, OutcomeTally>,
    /// Strengths of every signal this playbook raised, most recent last.
    pub strength_history: VecDeque<f64>,
}

impl PlaybookStats {
    pub fn record_trade(&mut self, trade: &ClosedTrade) {
        self.trade_count += 1;
        if trade.is_win() {
            self.wins += 1;
            self.winner_mae.push_back(trade.mae.abs());
            if self.winner_mae.len() > WINNER_MAE_CAP {
                self.winner_mae.pop_front();
            }
        }
        self.cumulative_r += trade.realized_r;
        self.total_bars_held += u64::from(trade.bars_held);
        self.by_hour
            .entry(trade.entry_hour())
            .or_default()
            .record(trade.realized_r);
        self.by_regime
            .entry(trade.entry_regime)
            .or_default()
            .record(trade.realized_r);
    }

    pub fn record_strength(&mut self, strength: f64) {
        if !strength.is_finite() {
            return;
        }
        self.strength_history.push_back(strength);
        if self.strength_history.len() > STRENGTH_HISTORY_CAP {
            self.strength_history.pop_front();
        }
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.trade_count == 0 {
            None
        } else {
            Some(self.wins as f64 / self.trade_count as f64)
        }
    }

    pub fn expectancy(&self) -> Option<f64> {
        if self.trade_count == 0 {
            None
        } else {
            Some(self.cumulative_r / self.trade_count as f64)
        }
    }

    pub fn mean_bars_held(&self) -> Option<f64> {
        if self.trade_count == 0 {
            return None;
        }
        let mean = self.total_bars_held as f64 / self.trade_count as f64;
        if mean < EPSILON {
            None
        } else {
            Some(mean)
        }
    }

    pub fn hour(&self, hour: u32) -> OutcomeTally {
        self.by_hour.get(&hour).copied().unwrap_or_default()
    }

    pub fn regime(&self, label: RegimeLabel) -> OutcomeTally {
        self.by_regime.get(&label).copied().unwrap_or_default()
    }

    pub fn strengths(&self) -> Vec<f64> {
        self.strength_history.iter().copied().collect()
    }

    pub fn winner_maes(&self) -> Vec<f64> {
        self.winner_mae.iter().copied().collect()
    }
}

/// Stats for every registered playbook, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRegistry {
    stats: BTreeMap<PlaybookId, PlaybookStats>,
}

impl StatsRegistry {
    pub fn new(ids: impl IntoIterator<Item = PlaybookId>) -> Self {
        Self {
            stats: ids.into_iter().map(|id| (id, PlaybookStats::default())).collect(),
        }
    }

    pub fn get(&self, id: PlaybookId) -> Option<&PlaybookStats> {
        self.stats.get(&id)
    }

    pub fn get_mut(&mut self, id: PlaybookId) -> &mut PlaybookStats {
        self.stats.entry(id).or_default()
    }

    pub fn record_trade(&mut self, trade: &ClosedTrade) {
        self.get_mut(trade.playbook_id).record_trade(trade);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaybookId, &PlaybookStats)> {
        self.stats.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<PlaybookId, PlaybookStats> {
        &self.stats
    }
}
