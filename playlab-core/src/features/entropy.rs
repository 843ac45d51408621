//! Rotation-path entropy.
//!
//! Each close-to-close step is classified up or down (flat steps are
//! skipped). Consecutive steps form transition pairs (UU, UD, DU, DD). The
//! Shannon entropy of the pair distribution, divided by ln(4), lies in
//! [0, 1]: 0 for a one-way path, 1 for maximal rotation.

use crate::domain::Bar;

const PAIR_KINDS: f64 = 4.0;

/// Entropy over the last `n` steps (needs `n + 1` bars). 0 when the window
/// contains no transition pair.
pub fn path_entropy(window: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }
    let tail = &window[window.len() - n - 1..];
    let moves: Vec<bool> = tail
        .windows(2)
        .filter_map(|pair| {
            let delta = pair[1].close - pair[0].close;
            if delta > 0.0 {
                Some(true)
            } else if delta < 0.0 {
                Some(false)
            } else {
                None
            }
        })
        .collect();

    // [UU, UD, DU, DD]
    let mut counts = [0usize; 4];
    for pair in moves.windows(2) {
        let idx = match (pair[0], pair[1]) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        counts[idx] += 1;
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Some(0.0);
    }

    let total = total as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    Some((h / PAIR_KINDS.ln()).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_bars;

    #[test]
    fn monotone_path_has_zero_entropy() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        assert_eq!(path_entropy(&bars, 20), Some(0.0));
    }

    #[test]
    fn flat_path_has_zero_entropy() {
        let bars = make_bars(&[100.0; 25]);
        assert_eq!(path_entropy(&bars, 20), Some(0.0));
    }

    #[test]
    fn mixed_path_is_high_entropy() {
        // up, up, down, down, repeated: all four pair kinds equally often
        let pattern = [0.0, 1.0, 2.0, 1.0];
        let closes: Vec<f64> = (0..41).map(|i| 100.0 + pattern[i % 4]).collect();
        let bars = make_bars(&closes);
        let h = path_entropy(&bars, 40).unwrap();
        assert!(h > 0.95, "entropy = {h}");
    }

    #[test]
    fn not_usable_without_history() {
        let bars = make_bars(&[100.0; 5]);
        assert!(path_entropy(&bars, 20).is_none());
    }
}
