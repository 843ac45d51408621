//! Three-phase stop proposals.
//!
//! - Phase 1: distance from the playbook's historical winner |MAE| quantile
//! - Phase 2: nearest confirmed structural pivot, offset by an ATR buffer
//! - Phase 3: trailing behind the extreme favorable price by a fixed R
//!
//! Proposals are raw levels; the caller ratchets them. A proposal on the
//! wrong side of the current close is discarded.

use crate::domain::{Bar, Direction, Phase, Position};
use crate::numeric::{quantile, EPSILON};

use super::params::StopParams;
use super::stats::PlaybookStats;

/// Raw stop proposal for the position's current phase.
pub fn propose(
    position: &Position,
    history: &[Bar],
    bar: &Bar,
    atr: Option<f64>,
    params: &StopParams,
    stats: &PlaybookStats,
) -> Option<f64> {
    let proposed = match position.phase {
        Phase::Initial => mae_quantile_stop(position, params, stats),
        Phase::Structural => pivot_stop(position, history, bar, atr?, params),
        Phase::Trailing => Some(trailing_stop(position, params)),
    }?;
    protective_side(position.direction, proposed, bar.close)
}

/// Keep `level` only if it sits strictly on the protective side of `close`.
pub fn protective_side(direction: Direction, level: f64, close: f64) -> Option<f64> {
    if !level.is_finite() {
        return None;
    }
    let ok = match direction {
        Direction::Long => level < close,
        Direction::Short => level > close,
    };
    ok.then_some(level)
}

/// Phase 1: entry ∓ q(|MAE| of winners) × 1R, once enough winners exist.
pub fn mae_quantile_stop(
    position: &Position,
    params: &StopParams,
    stats: &PlaybookStats,
) -> Option<f64> {
    if stats.winner_mae.len() < params.mae_min_samples.max(1) {
        return None;
    }
    let q = quantile(&stats.winner_maes(), params.mae_quantile)?;
    if q < EPSILON {
        return None;
    }
    Some(position.entry_price - position.direction.sign() * q * position.risk)
}

/// Phase 2: most recent swing low (long) or swing high (short) within the
/// lookback, confirmed by `pivot_span` bars on each side.
pub fn pivot_stop(
    position: &Position,
    history: &[Bar],
    bar: &Bar,
    atr: f64,
    params: &StopParams,
) -> Option<f64> {
    let pivot = find_pivot(history, bar, position.direction, params.pivot_span, params.pivot_lookback)?;
    Some(pivot - position.direction.sign() * params.pivot_buffer_atr * atr)
}

/// Phase 3: favorable extreme ∓ trail distance.
pub fn trailing_stop(position: &Position, params: &StopParams) -> f64 {
    position.favorable_extreme - position.direction.sign() * params.trail_distance_r * position.risk
}

/// Price of the most recent confirmed pivot on the protective side.
pub fn find_pivot(
    history: &[Bar],
    bar: &Bar,
    direction: Direction,
    span: usize,
    lookback: usize,
) -> Option<f64> {
    let take = lookback.saturating_sub(1).min(history.len());
    let mut window: Vec<f64> = history[history.len() - take..]
        .iter()
        .map(|b| protective_extreme(b, direction))
        .collect();
    window.push(protective_extreme(bar, direction));

    if span == 0 || window.len() < 2 * span + 1 {
        return None;
    }
    // newest candidate first; a pivot needs `span` bars after it
    for i in (span..window.len() - span).rev() {
        let center = window[i];
        let left = &window[i - span..i];
        let right = &window[i + 1..=i + span];
        let is_pivot = match direction {
            Direction::Long => left.iter().chain(right).all(|v| center < *v),
            Direction::Short => left.iter().chain(right).all(|v| center > *v),
        };
        if is_pivot {
            return Some(center);
        }
    }
    None
}

fn protective_extreme(bar: &Bar, direction: Direction) -> f64 {
    match direction {
        Direction::Long => bar.low,
        Direction::Short => bar.high,
    }
}
