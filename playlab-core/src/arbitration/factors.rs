//! The five arbitration factors, each mapped into [0, 1].

use crate::domain::{Factor, FactorVector, Position, Signal};
use crate::numeric::{mean, percentile_rank, unit_tanh};
use crate::playbook::PlaybookStats;
use crate::sizing::CorrelationTracker;

use super::ArbitratorConfig;

/// Regime alignment as carried by the signal.
pub fn regime_alignment(signal: &Signal) -> f64 {
    signal.regime_alignment.clamp(0.0, 1.0)
}

/// ½ + ½·tanh(mean R of trades opened in this hour); 0.5 below the sample floor.
pub fn hour_expectancy(stats: &PlaybookStats, hour: u32, min_samples: usize) -> f64 {
    let tally = stats.hour(hour);
    if tally.count < min_samples.max(1) {
        return 0.5;
    }
    tally.expectancy().map(unit_tanh).unwrap_or(0.5)
}

/// Share of the playbook's recorded strengths ≤ this one; 0.5 with no history.
pub fn strength_percentile(stats: &PlaybookStats, strength: f64) -> f64 {
    percentile_rank(&stats.strengths(), strength).unwrap_or(0.5)
}

/// ½ + ½·tanh(scale · expected R / expected bars held).
///
/// Uses the playbook's record once it has enough trades, otherwise the
/// signal's target schedule and the default holding period.
pub fn capital_efficiency(signal: &Signal, stats: &PlaybookStats, config: &ArbitratorConfig) -> f64 {
    let sampled = stats.trade_count >= config.efficiency_min_samples.max(1);
    let expected_r = if sampled {
        stats.expectancy().unwrap_or(0.0)
    } else {
        signal.scheduled_r()
    };
    let expected_bars = if sampled {
        stats.mean_bars_held().unwrap_or(config.default_holding_bars)
    } else {
        config.default_holding_bars
    };
    if expected_bars <= 0.0 {
        return 0.5;
    }
    unit_tanh(config.efficiency_scale * expected_r / expected_bars)
}

/// 1 − mean positive correlation to open positions; 1 with none open.
pub fn correlation_factor(signal: &Signal, open_positions: &[Position], tracker: &CorrelationTracker) -> f64 {
    let positives: Vec<f64> = open_positions
        .iter()
        .map(|p| {
            tracker
                .correlation(
                    (signal.playbook_id, signal.direction),
                    (p.playbook_id, p.direction),
                )
                .max(0.0)
        })
        .collect();
    match mean(&positives) {
        Some(avg) => (1.0 - avg).clamp(0.0, 1.0),
        None => 1.0,
    }
}

/// All five factors for one candidate.
pub fn compute(
    signal: &Signal,
    stats: &PlaybookStats,
    open_positions: &[Position],
    tracker: &CorrelationTracker,
    hour: u32,
    config: &ArbitratorConfig,
) -> FactorVector {
    let mut v = FactorVector::default();
    v.set(Factor::RegimeAlignment, regime_alignment(signal));
    v.set(Factor::HourExpectancy, hour_expectancy(stats, hour, config.hour_min_samples));
    v.set(Factor::StrengthPercentile, strength_percentile(stats, signal.strength));
    v.set(Factor::CapitalEfficiency, capital_efficiency(signal, stats, config));
    v.set(Factor::Correlation, correlation_factor(signal, open_positions, tracker));
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::test_support::signal;
    use crate::domain::{Direction, PlaybookId};
    use crate::playbook::test_support::open_position;

    #[test]
    fn neutral_without_history() {
        let s = signal(1, Direction::Long, 100.0, 0.6, 0.8);
        let stats = PlaybookStats::default();
        let tracker = CorrelationTracker::new(50);
        let v = compute(&s, &stats, &[], &tracker, 10, &ArbitratorConfig::default());
        assert_eq!(v.get(Factor::RegimeAlignment), 0.8);
        assert_eq!(v.get(Factor::HourExpectancy), 0.5);
        assert_eq!(v.get(Factor::StrengthPercentile), 0.5);
        assert_eq!(v.get(Factor::Correlation), 1.0);
        assert!(v.get(Factor::CapitalEfficiency) > 0.5);
    }

    #[test]
    fn strength_percentile_uses_own_history() {
        let mut stats = PlaybookStats::default();
        for s in [0.2, 0.4, 0.6, 0.8] {
            stats.record_strength(s);
        }
        assert_eq!(strength_percentile(&stats, 0.5), 0.5);
        assert_eq!(strength_percentile(&stats, 0.9), 1.0);
    }

    #[test]
    fn same_direction_same_playbook_is_fully_penalized() {
        let s = signal(1, Direction::Long, 100.0, 0.6, 0.8);
        let tracker = CorrelationTracker::new(50);
        let open = [open_position(PlaybookId(1), Direction::Long, 95.0)];
        assert_eq!(correlation_factor(&s, &open, &tracker), 0.0);
        let hedge = [open_position(PlaybookId(1), Direction::Short, 95.0)];
        assert_eq!(correlation_factor(&s, &hedge, &tracker), 1.0);
    }
}
