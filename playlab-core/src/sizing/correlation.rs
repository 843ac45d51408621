//! Rolling co-movement of playbook exposures.
//!
//! Each bar, every tracked playbook records the long-equivalent R change of
//! its open exposure: Σ remaining × Δclose / risk over its positions, zero
//! when flat. Series stay aligned because every playbook gets a value on
//! every bar. The pairwise Pearson correlation of two series measures how
//! much their exposures overlap in time; it is signed by the direction
//! product of the pair being compared.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, PlaybookId, Position};
use crate::numeric::{pearson, EPSILON};

/// Samples required before a Pearson estimate replaces the fallback.
pub const MIN_OVERLAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTracker {
    window: usize,
    series: BTreeMap<PlaybookId, VecDeque<f64>>,
}

impl CorrelationTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            series: BTreeMap::new(),
        }
    }

    pub fn with_playbooks(window: usize, ids: impl IntoIterator<Item = PlaybookId>) -> Self {
        let mut tracker = Self::new(window);
        for id in ids {
            tracker.series.insert(id, VecDeque::new());
        }
        tracker
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of samples recorded for a playbook.
    pub fn samples(&self, id: PlaybookId) -> usize {
        self.series.get(&id).map_or(0, VecDeque::len)
    }

    /// Append one bar of exposure returns for every tracked playbook.
    pub fn record_bar(&mut self, positions: &[Position], price_change: f64) {
        let window = self.window;
        for (id, series) in self.series.iter_mut() {
            let value: f64 = positions
                .iter()
                .filter(|p| p.playbook_id == *id && p.risk > EPSILON)
                .map(|p| p.remaining * price_change / p.risk)
                .sum();
            series.push_back(if value.is_finite() { value } else { 0.0 });
            while series.len() > window {
                series.pop_front();
            }
        }
    }

    /// Direction-adjusted correlation in [-1, 1].
    ///
    /// Same playbook, or too little data, or a flat series: the direction
    /// product (1 same side, -1 opposite).
    pub fn correlation(&self, a: (PlaybookId, Direction), b: (PlaybookId, Direction)) -> f64 {
        let direction_product = a.1.sign() * b.1.sign();
        if a.0 == b.0 {
            return direction_product;
        }
        let (Some(xs), Some(ys)) = (self.series.get(&a.0), self.series.get(&b.0)) else {
            return direction_product;
        };
        let n = xs.len().min(ys.len());
        if n < MIN_OVERLAP {
            return direction_product;
        }
        let xs: Vec<f64> = xs.iter().skip(xs.len() - n).copied().collect();
        let ys: Vec<f64> = ys.iter().skip(ys.len() - n).copied().collect();
        match pearson(&xs, &ys) {
            Some(rho) => rho * direction_product,
            None => direction_product,
        }
    }
}
