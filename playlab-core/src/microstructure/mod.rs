//! Microstructure Feature Module: pure, total functions over a book snapshot.
//!
//! Absent snapshots and malformed levels never fail: they yield neutral
//! results (zero imbalances, no fair value, no flagged levels). Malformed
//! levels are skipped with a warning.

pub mod imbalance;
pub mod levels;
pub mod lookup;

pub use lookup::{NoSnapshots, SnapshotIndex, SnapshotSource};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ConfigError;
use crate::domain::OrderBookSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrostructureConfig {
    /// Absolute size above which a bid level counts as a large resting order.
    pub large_order_bid_size: f64,
    /// Absolute size above which an ask level counts as a large resting order.
    pub large_order_ask_size: f64,
    /// Levels per side considered for depth imbalance and level scans.
    pub max_levels: usize,
}

impl Default for MicrostructureConfig {
    fn default() -> Self {
        Self {
            large_order_bid_size: 500.0,
            large_order_ask_size: 500.0,
            max_levels: 10,
        }
    }
}

impl MicrostructureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("large_order_bid_size", self.large_order_bid_size),
            ("large_order_ask_size", self.large_order_ask_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidParam {
                    section: "microstructure".into(),
                    name: name.into(),
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }
        if self.max_levels == 0 {
            return Err(ConfigError::InvalidParam {
                section: "microstructure".into(),
                name: "max_levels".into(),
                reason: "must be >= 1".into(),
            });
        }
        Ok(())
    }
}

/// Prices of levels whose size exceeds the per-side threshold, best first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LargeOrders {
    pub bids: Vec<f64>,
    pub asks: Vec<f64>,
}

impl LargeOrders {
    pub fn any_bid(&self) -> bool {
        !self.bids.is_empty()
    }

    pub fn any_ask(&self) -> bool {
        !self.asks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MicrostructureFeatures {
    /// Snapshot timestamp; `None` when no snapshot was available.
    pub timestamp: Option<NaiveDateTime>,
    /// (bid0 - ask0) / (bid0 + ask0) at the best level, in [-1, 1].
    pub order_flow_imbalance: f64,
    /// Same ratio summed over all considered levels, in [-1, 1].
    pub depth_imbalance: f64,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    /// Size-weighted blend of best bid and ask (microprice).
    pub fair_value: Option<f64>,
    pub large_orders: LargeOrders,
    /// Price of the largest bid level.
    pub support: Option<f64>,
    /// Price of the largest ask level.
    pub resistance: Option<f64>,
}

impl MicrostructureFeatures {
    /// Neutral result for an absent snapshot.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Compute all microstructure features. Total: absent input gives neutral output.
pub fn compute(
    snapshot: Option<&OrderBookSnapshot>,
    config: &MicrostructureConfig,
) -> MicrostructureFeatures {
    let Some(snapshot) = snapshot else {
        return MicrostructureFeatures::neutral();
    };

    let malformed = snapshot.malformed_levels();
    if malformed > 0 {
        warn!(
            timestamp = %snapshot.timestamp,
            malformed,
            "skipping malformed order-book levels"
        );
    }

    let mut bids = snapshot.sorted_bids();
    let mut asks = snapshot.sorted_asks();
    bids.truncate(config.max_levels);
    asks.truncate(config.max_levels);

    let best_bid = bids.first().copied();
    let best_ask = asks.first().copied();

    MicrostructureFeatures {
        timestamp: Some(snapshot.timestamp),
        order_flow_imbalance: imbalance::order_flow_imbalance(best_bid.as_ref(), best_ask.as_ref()),
        depth_imbalance: imbalance::depth_imbalance(&bids, &asks),
        best_bid: best_bid.map(|l| l.price),
        best_ask: best_ask.map(|l| l.price),
        fair_value: imbalance::fair_value(best_bid.as_ref(), best_ask.as_ref()),
        large_orders: LargeOrders {
            bids: levels::large_levels(&bids, config.large_order_bid_size),
            asks: levels::large_levels(&asks, config.large_order_ask_size),
        },
        support: levels::max_size_level(&bids),
        resistance: levels::max_size_level(&asks),
    }
}
