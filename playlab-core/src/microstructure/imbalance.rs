//! Imbalance ratios and fair value.
//!
//! Both imbalances are (bid - ask) / (bid + ask), bounded to [-1, 1] and 0
//! when the denominator vanishes.

use crate::domain::BookLevel;
use crate::numeric::EPSILON;

fn bounded_ratio(bid: f64, ask: f64) -> f64 {
    let total = bid + ask;
    if !total.is_finite() || total < EPSILON {
        return 0.0;
    }
    ((bid - ask) / total).clamp(-1.0, 1.0)
}

/// Best-level imbalance. 0 when either side is missing.
pub fn order_flow_imbalance(best_bid: Option<&BookLevel>, best_ask: Option<&BookLevel>) -> f64 {
    match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => bounded_ratio(bid.size, ask.size),
        _ => 0.0,
    }
}

/// Imbalance of total resting size across the given levels.
pub fn depth_imbalance(bids: &[BookLevel], asks: &[BookLevel]) -> f64 {
    let bid: f64 = bids.iter().map(|l| l.size).sum();
    let ask: f64 = asks.iter().map(|l| l.size).sum();
    bounded_ratio(bid, ask)
}

/// Microprice: (bid_px * ask_sz + ask_px * bid_sz) / (bid_sz + ask_sz).
///
/// Midpoint when both best sizes are zero; `None` when a side is empty or
/// the book is crossed.
pub fn fair_value(best_bid: Option<&BookLevel>, best_ask: Option<&BookLevel>) -> Option<f64> {
    let (bid, ask) = (best_bid?, best_ask?);
    if bid.price > ask.price {
        return None;
    }
    let total = bid.size + ask.size;
    if total < EPSILON {
        return Some((bid.price + ask.price) / 2.0);
    }
    Some((bid.price * ask.size + ask.price * bid.size) / total)
}
