//! Composite liquidity score in [0, 1].
//!
//! score = 0.5 * min(relative volume, 2) / 2 + 0.5 * tightness
//! tightness = 1 / (1 + current range% / average range%), 0.5 when the
//! average range is zero.

use crate::domain::Bar;
use crate::numeric::{mean, EPSILON};

use super::participation::relative_volume;

const VOLUME_CAP: f64 = 2.0;

fn range_pct(bar: &Bar) -> f64 {
    if bar.close.abs() < EPSILON {
        return 0.0;
    }
    bar.range().max(0.0) / bar.close.abs()
}

/// Liquidity score of the last bar against the `n` bars before it.
pub fn liquidity_score(window: &[Bar], n: usize) -> Option<f64> {
    let rel_volume = relative_volume(window, n)?;
    let (current, rest) = window.split_last()?;
    let reference: Vec<f64> = rest[rest.len() - n..].iter().map(range_pct).collect();
    let avg_range = mean(&reference)?;
    let tightness = if avg_range < EPSILON {
        0.5
    } else {
        1.0 / (1.0 + range_pct(current) / avg_range)
    };
    let volume_term = rel_volume.clamp(0.0, VOLUME_CAP) / VOLUME_CAP;
    Some((0.5 * volume_term + 0.5 * tightness).clamp(0.0, 1.0))
}
