//! Salvage exit for trades that showed profit and then reversed.
//!
//! score = w_r · retracement + w_s · staleness + w_v · velocity decay
//!
//! - retracement: (MFE − current R) / MFE, in [0, 1]
//! - staleness: bars since the MFE was set / salvage window, in [0, 1]
//! - velocity decay: 1 − recent R velocity / run-up R velocity, in [0, 1]
//!
//! Armed only once MFE reaches `min_mfe_r` and while the last MFE extension
//! is within `window_bars`.

use crate::domain::{Bar, Position};
use crate::numeric::EPSILON;

use super::params::SalvageParams;

/// Component breakdown of the salvage score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalvageScore {
    pub retracement: f64,
    pub staleness: f64,
    pub velocity_decay: f64,
    pub total: f64,
}

/// True if the salvage rule is armed for this position.
pub fn is_armed(position: &Position, params: &SalvageParams) -> bool {
    position.mfe > EPSILON
        && position.mfe >= params.min_mfe_r
        && position.bars_since_mfe <= params.window_bars
}

/// Score the position on the current bar, or `None` when not armed.
pub fn score(position: &Position, history: &[Bar], bar: &Bar, params: &SalvageParams) -> Option<SalvageScore> {
    if !is_armed(position, params) {
        return None;
    }
    let current_r = position.r_at(bar.close);
    let retracement = ((position.mfe - current_r) / position.mfe).clamp(0.0, 1.0);

    let staleness = if params.window_bars == 0 {
        0.0
    } else {
        (position.bars_since_mfe as f64 / params.window_bars as f64).clamp(0.0, 1.0)
    };

    let runup_bars = position.bars_held.saturating_sub(position.bars_since_mfe).max(1);
    let runup_velocity = position.mfe / runup_bars as f64;

    let lookback = params.velocity_lookback.max(1);
    let held = position.bars_held as usize;
    let (reference_close, span) = if held > lookback && history.len() >= lookback {
        (history[history.len() - lookback].close, lookback)
    } else {
        (position.entry_price, held.max(1))
    };
    let recent_velocity = (current_r - position.r_at(reference_close)) / span as f64;
    let velocity_decay = if runup_velocity < EPSILON {
        0.0
    } else {
        (1.0 - recent_velocity / runup_velocity).clamp(0.0, 1.0)
    };

    let total = params.retracement_weight * retracement
        + params.staleness_weight * staleness
        + params.velocity_weight * velocity_decay;
    Some(SalvageScore {
        retracement,
        staleness,
        velocity_decay,
        total,
    })
}

/// Salvage fires when armed, retraced, and the score reaches the threshold.
pub fn should_salvage(position: &Position, history: &[Bar], bar: &Bar, params: &SalvageParams) -> bool {
    match score(position, history, bar, params) {
        Some(s) => s.retracement > 0.0 && s.total >= params.threshold,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, FactorVector, PlaybookId, PositionId, RegimeLabel, Signal};
    use crate::features::make_bars;

    fn long_position() -> Position {
        let signal = Signal {
            playbook_id: PlaybookId(1),
            timestamp: make_bars(&[100.0])[0].timestamp,
            direction: Direction::Long,
            reference_price: 100.0,
            initial_stop: 95.0,
            targets: vec![],
            strength: 0.5,
            regime_alignment: 0.5,
        };
        Position::open(PositionId(1), &signal, 0.01, RegimeLabel::Trend, FactorVector::default())
    }

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        let mut b = make_bars(&[close])[0];
        b.high = high;
        b.low = low;
        b.open = close;
        b
    }

    #[test]
    fn sharp_retracement_fires() {
        let mut p = long_position();
        let b1 = bar(104.0, 100.5, 103.5);
        p.bars_held = 1;
        p.update_excursion(&b1);
        let params = SalvageParams::default();
        assert!(!should_salvage(&p, &[], &b1, &params));

        let b2 = bar(103.6, 100.4, 100.5);
        p.bars_held = 2;
        p.update_excursion(&b2);
        let s = score(&p, &[b1], &b2, &params).unwrap();
        assert!((s.retracement - 0.875).abs() < 1e-9);
        assert!(s.total >= params.threshold);
        assert!(should_salvage(&p, &[b1], &b2, &params));
    }

    #[test]
    fn not_armed_below_min_mfe() {
        let mut p = long_position();
        let b = bar(101.5, 100.0, 100.1);
        p.bars_held = 1;
        p.update_excursion(&b);
        assert!(score(&p, &[], &b, &SalvageParams::default()).is_none());
    }

    #[test]
    fn not_armed_after_window() {
        let mut p = long_position();
        p.mfe = 1.0;
        p.favorable_extreme = 105.0;
        p.bars_held = 20;
        p.bars_since_mfe = 7;
        let b = bar(101.0, 100.0, 100.2);
        assert!(!should_salvage(&p, &[], &b, &SalvageParams::default()));
    }

    #[test]
    fn at_high_does_not_fire() {
        let mut p = long_position();
        let b = bar(104.0, 100.5, 104.0);
        p.bars_held = 1;
        p.update_excursion(&b);
        assert!(!should_salvage(&p, &[], &b, &SalvageParams::default()));
    }
}
