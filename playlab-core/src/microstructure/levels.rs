//! Level scans: large resting orders and support/resistance clusters.

use crate::domain::BookLevel;

/// Prices of levels strictly larger than `threshold`, in input order.
pub fn large_levels(levels: &[BookLevel], threshold: f64) -> Vec<f64> {
    levels
        .iter()
        .filter(|l| l.size > threshold)
        .map(|l| l.price)
        .collect()
}

/// Price of the maximum-size level. The first (best) level wins size ties.
pub fn max_size_level(levels: &[BookLevel]) -> Option<f64> {
    let mut best: Option<&BookLevel> = None;
    for level in levels {
        match best {
            Some(b) if level.size <= b.size => {}
            _ => best = Some(level),
        }
    }
    best.filter(|l| l.size > 0.0).map(|l| l.price)
}
