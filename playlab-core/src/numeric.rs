//! Small numeric helpers shared by the feature engine, arbitrator and sizing.
//!
//! Every helper is total: empty or degenerate input yields `None` or a neutral
//! value, never a division by zero.

/// Values at or below this magnitude are treated as zero.
pub const EPSILON: f64 = 1e-12;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation. `None` for an empty slice.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.max(0.0).sqrt())
}

/// Pearson correlation of two equally long series.
///
/// `None` when the series differ in length, have fewer than two points, or
/// either has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= EPSILON || vy <= EPSILON {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

/// Share of `history` values less than or equal to `value`, in [0, 1].
pub fn percentile_rank(history: &[f64], value: f64) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let at_or_below = history.iter().filter(|h| **h <= value).count();
    Some(at_or_below as f64 / history.len() as f64)
}

/// Linearly interpolated quantile, `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Numerically stable `ln(Σ exp(x))`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Maps any real number into (0, 1) with 0 → 0.5.
pub fn unit_tanh(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.5;
    }
    0.5 + 0.5 * x.tanh()
}

/// Division that returns `fallback` when the denominator is (near) zero or
/// the result is not finite.
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() <= EPSILON {
        return fallback;
    }
    let out = numerator / denominator;
    if out.is_finite() {
        out
    } else {
        fallback
    }
}
