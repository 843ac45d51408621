//! Volatility descriptors: realized vol, cross-timeframe ratio, ATR.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR here is the simple mean of the last `period` true ranges.

use crate::domain::Bar;
use crate::numeric::{mean, std_dev, EPSILON};

/// Close-to-close log returns of the last `n` steps, oldest first.
///
/// Returns `None` if fewer than `n + 1` bars are available or any close is
/// non-positive.
pub fn log_returns(window: &[Bar], n: usize) -> Option<Vec<f64>> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }
    let tail = &window[window.len() - n - 1..];
    let mut out = Vec::with_capacity(n);
    for pair in tail.windows(2) {
        let (prev, cur) = (pair[0].close, pair[1].close);
        if prev <= 0.0 || cur <= 0.0 {
            return None;
        }
        out.push((cur / prev).ln());
    }
    Some(out)
}

/// Standard deviation of the last `n` log returns.
pub fn realized_vol(window: &[Bar], n: usize) -> Option<f64> {
    let returns = log_returns(window, n)?;
    std_dev(&returns)
}

/// Fast realized vol over slow realized vol. Neutral 1.0 when the slow
/// window is flat.
pub fn volatility_ratio(window: &[Bar], fast: usize, slow: usize) -> Option<f64> {
    let slow_vol = realized_vol(window, slow)?;
    let fast_vol = realized_vol(window, fast)?;
    if slow_vol < EPSILON {
        return Some(1.0);
    }
    Some(fast_vol / slow_vol)
}

/// True range of `bar` given the previous close.
pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

/// Mean true range over the last `period` bars (needs `period + 1` bars).
pub fn atr(window: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || window.len() < period + 1 {
        return None;
    }
    let tail = &window[window.len() - period - 1..];
    let ranges: Vec<f64> = tail
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .collect();
    let value = mean(&ranges)?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
