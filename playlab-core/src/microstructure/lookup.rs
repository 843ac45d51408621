//! Snapshot lookup by nearest timestamp.
//!
//! The core only ever asks `get_snapshot(timestamp, tolerance)`; it never
//! decompresses or fetches anything. `SnapshotIndex` is the in-memory,
//! pre-sorted implementation used by the driver and tests.

use chrono::{Duration, NaiveDateTime};

use crate::domain::OrderBookSnapshot;

/// Synchronous, pre-indexed snapshot lookup.
pub trait SnapshotSource {
    /// Nearest snapshot within `tolerance` of `timestamp`, if any.
    fn get_snapshot(&self, timestamp: NaiveDateTime, tolerance: Duration) -> Option<&OrderBookSnapshot>;
}

/// Source with no snapshots. Every lookup degrades to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSnapshots;

impl SnapshotSource for NoSnapshots {
    fn get_snapshot(&self, _timestamp: NaiveDateTime, _tolerance: Duration) -> Option<&OrderBookSnapshot> {
        None
    }
}

/// Snapshots sorted by timestamp, searched by bisection.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    snapshots: Vec<OrderBookSnapshot>,
}

impl SnapshotIndex {
    pub fn new(mut snapshots: Vec<OrderBookSnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.timestamp);
        Self { snapshots }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[OrderBookSnapshot] {
        &self.snapshots
    }
}

impl FromIterator<OrderBookSnapshot> for SnapshotIndex {
    fn from_iter<I: IntoIterator<Item = OrderBookSnapshot>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl SnapshotSource for SnapshotIndex {
    fn get_snapshot(&self, timestamp: NaiveDateTime, tolerance: Duration) -> Option<&OrderBookSnapshot> {
        if self.snapshots.is_empty() || tolerance < Duration::zero() {
            return None;
        }
        // first index with snapshot.timestamp >= timestamp
        let idx = self.snapshots.partition_point(|s| s.timestamp < timestamp);
        let before = idx.checked_sub(1).and_then(|i| self.snapshots.get(i));
        let after = self.snapshots.get(idx);

        let nearest = match (before, after) {
            (Some(b), Some(a)) => {
                let db = timestamp - b.timestamp;
                let da = a.timestamp - timestamp;
                // earlier snapshot wins exact ties
                if db <= da {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        let distance = if nearest.timestamp >= timestamp {
            nearest.timestamp - timestamp
        } else {
            timestamp - nearest.timestamp
        };
        if distance <= tolerance {
            Some(nearest)
        } else {
            None
        }
    }
}
