//! Near-duplicate suppression among same-bar candidates.
//!
//! similarity = w_p · max(0, 1 − |Δprice| / max initial risk)
//!            + (1 − w_p) · (1 − |Δregime alignment|)
//!
//! Within each direction, candidates are visited by strength (desc), then
//! playbook id (asc). A candidate is dropped if it is redundant with any
//! already-kept one, so the stronger member of a redundant pair survives.

use crate::domain::{Direction, Signal};
use crate::numeric::EPSILON;

/// Similarity of two signals in [0, 1]. Opposite directions are never similar.
pub fn similarity(a: &Signal, b: &Signal, price_weight: f64) -> f64 {
    if a.direction != b.direction {
        return 0.0;
    }
    let scale = a.risk().max(b.risk());
    let price_term = if scale < EPSILON {
        if (a.reference_price - b.reference_price).abs() < EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - (a.reference_price - b.reference_price).abs() / scale).max(0.0)
    };
    let alignment_term = 1.0 - (a.regime_alignment - b.regime_alignment).abs().min(1.0);
    price_weight * price_term + (1.0 - price_weight) * alignment_term
}

/// Split candidates into (survivors, suppressed). Survivors keep a
/// deterministic order: direction, then strength desc, then id asc.
pub fn suppress(candidates: Vec<Signal>, threshold: f64, price_weight: f64) -> (Vec<Signal>, Vec<Signal>) {
    let mut ordered = candidates;
    ordered.sort_by(|a, b| {
        direction_rank(a.direction)
            .cmp(&direction_rank(b.direction))
            .then(b.strength.total_cmp(&a.strength))
            .then(a.playbook_id.cmp(&b.playbook_id))
    });

    let mut kept: Vec<Signal> = Vec::with_capacity(ordered.len());
    let mut suppressed = Vec::new();
    for candidate in ordered {
        let redundant = kept
            .iter()
            .any(|k| similarity(k, &candidate, price_weight) > threshold);
        if redundant {
            suppressed.push(candidate);
        } else {
            kept.push(candidate);
        }
    }
    (kept, suppressed)
}

fn direction_rank(direction: Direction) -> u8 {
    match direction {
        Direction::Long => 0,
        Direction::Short => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::test_support::signal;

    #[test]
    fn identical_signals_keep_stronger() {
        let weak = signal(1, Direction::Long, 100.0, 0.4, 0.7);
        let strong = signal(2, Direction::Long, 100.0, 0.8, 0.7);
        let (kept, dropped) = suppress(vec![weak, strong], 0.85, 0.6);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].playbook_id.0, 2);
        assert_eq!(dropped[0].playbook_id.0, 1);
    }

    #[test]
    fn equal_strength_keeps_lower_id() {
        let a = signal(3, Direction::Short, 100.0, 0.5, 0.5);
        let b = signal(1, Direction::Short, 100.0, 0.5, 0.5);
        let (kept, _) = suppress(vec![a, b], 0.85, 0.6);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].playbook_id.0, 1);
    }

    #[test]
    fn opposite_directions_both_survive() {
        let a = signal(1, Direction::Long, 100.0, 0.5, 0.5);
        let b = signal(2, Direction::Short, 100.0, 0.5, 0.5);
        let (kept, dropped) = suppress(vec![a, b], 0.85, 0.6);
        assert_eq!(kept.len(), 2);
        assert!(dropped.is_empty());
    }

    #[test]
    fn distant_prices_are_not_redundant() {
        // risk 2.0 on both; 3.0 apart → price term 0
        let a = signal(1, Direction::Long, 100.0, 0.5, 0.5);
        let b = signal(2, Direction::Long, 103.0, 0.5, 0.5);
        assert!((similarity(&a, &b, 0.6) - 0.4).abs() < 1e-12);
        let (kept, _) = suppress(vec![a, b], 0.85, 0.6);
        assert_eq!(kept.len(), 2);
    }
}
