//! Directional commitment: net close change over gross absolute change.

use crate::domain::Bar;
use crate::numeric::EPSILON;

/// Net / gross over the last `n` steps, in [-1, 1]. 0 when nothing moved.
pub fn directional_commitment(window: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }
    let tail = &window[window.len() - n - 1..];
    let mut net = 0.0;
    let mut gross = 0.0;
    for pair in tail.windows(2) {
        let delta = pair[1].close - pair[0].close;
        net += delta;
        gross += delta.abs();
    }
    if gross < EPSILON {
        return Some(0.0);
    }
    Some((net / gross).clamp(-1.0, 1.0))
}
