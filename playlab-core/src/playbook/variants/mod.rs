//! Concrete playbook variants.
//!
//! Each variant contributes a setup detector and reads its own named
//! parameters from `PlaybookParams::setup` at construction.

pub mod range_reversion;
pub mod transition_breakout;
pub mod trend_continuation;
pub mod volatility_expansion;

pub use range_reversion::RangeReversion;
pub use transition_breakout::TransitionBreakout;
pub use trend_continuation::TrendContinuation;
pub use volatility_expansion::VolatilityExpansion;

use crate::domain::Bar;

/// Highest high and lowest low of the last `n` bars, or `None` if fewer exist.
pub(crate) fn channel(history: &[Bar], n: usize) -> Option<(f64, f64)> {
    if n == 0 || history.len() < n {
        return None;
    }
    let tail = &history[history.len() - n..];
    let high = tail.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = tail.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if high.is_finite() && low.is_finite() {
        Some((high, low))
    } else {
        None
    }
}
