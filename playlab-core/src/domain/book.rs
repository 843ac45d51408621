//! Depth-of-book snapshot as handed over by the snapshot source.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One price level on one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
    pub order_count: u32,
}

impl BookLevel {
    pub fn new(price: f64, size: f64, order_count: u32) -> Self {
        Self {
            price,
            size,
            order_count,
        }
    }

    /// A usable level has a finite positive price and a finite non-negative size.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.size.is_finite() && self.size >= 0.0
    }
}

/// Immutable depth snapshot, up to K levels per side.
///
/// Levels are conventionally ordered best-first, but consumers must not rely
/// on it: the microstructure module re-derives ordering from prices and skips
/// malformed levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub timestamp: NaiveDateTime,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    pub fn new(timestamp: NaiveDateTime, bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self {
            timestamp,
            bids,
            asks,
        }
    }

    /// Valid bid levels, best (highest price) first.
    pub fn sorted_bids(&self) -> Vec<BookLevel> {
        let mut levels: Vec<BookLevel> = self.bids.iter().copied().filter(BookLevel::is_valid).collect();
        levels.sort_by(|a, b| b.price.total_cmp(&a.price));
        levels
    }

    /// Valid ask levels, best (lowest price) first.
    pub fn sorted_asks(&self) -> Vec<BookLevel> {
        let mut levels: Vec<BookLevel> = self.asks.iter().copied().filter(BookLevel::is_valid).collect();
        levels.sort_by(|a, b| a.price.total_cmp(&b.price));
        levels
    }

    /// Number of levels on either side that fail validation.
    pub fn malformed_levels(&self) -> usize {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .filter(|l| !l.is_valid())
            .count()
    }
}
