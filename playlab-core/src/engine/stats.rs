//! Aggregate run summary for external reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ClosedTrade, ExitReason, FactorVector, PlaybookId, RegimeLabel};
use crate::playbook::PlaybookStats;

/// Running counters owned by the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub bars_processed: usize,
    pub signals_raised: usize,
    pub signals_suppressed: usize,
    pub signals_selected: usize,
    /// Selected signals the sizing manager declined.
    pub sizing_rejections: usize,
    pub entries: usize,
    pub closed_trades: usize,
    pub wins: usize,
    pub total_r: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
    pub regime_counts: BTreeMap<RegimeLabel, usize>,
    /// Bars on which the regime was not determinable.
    pub undetermined_regimes: usize,
    pub peak_heat: f64,
}

impl Counters {
    pub fn record_trade(&mut self, trade: &ClosedTrade) {
        self.closed_trades += 1;
        if trade.is_win() {
            self.wins += 1;
        }
        self.total_r += trade.realized_r;
        *self.exit_reasons.entry(trade.exit_reason).or_default() += 1;
    }
}

/// Snapshot returned by `DecisionCore::get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreStats {
    #[serde(flatten)]
    pub counters: Counters,
    pub win_rate: Option<f64>,
    pub mean_r: Option<f64>,
    pub open_positions: usize,
    pub open_heat: f64,
    pub playbooks: BTreeMap<PlaybookId, PlaybookStats>,
    pub factor_weights: FactorVector,
}

impl CoreStats {
    pub fn new(
        counters: Counters,
        open_positions: usize,
        open_heat: f64,
        playbooks: BTreeMap<PlaybookId, PlaybookStats>,
        factor_weights: FactorVector,
    ) -> Self {
        let (win_rate, mean_r) = if counters.closed_trades == 0 {
            (None, None)
        } else {
            let n = counters.closed_trades as f64;
            (Some(counters.wins as f64 / n), Some(counters.total_r / n))
        };
        Self {
            counters,
            win_rate,
            mean_r,
            open_positions,
            open_heat,
            playbooks,
            factor_weights,
        }
    }
}
