//! Position — an open trade owned by the lifecycle manager.
//!
//! A position is mutated only through the operations defined here:
//! excursion update, phase advance, stop move, partial exit and close.
//! Closing consumes the position and yields a [`ClosedTrade`].
//!
//! All excursions are tracked in risk multiples (R) against the initial stop
//! distance and come from intrabar extremes, never from the close.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::factors::FactorVector;
use super::ids::{PlaybookId, PositionId};
use super::regime::RegimeLabel;
use super::signal::{Direction, ProfitTarget, Signal};
use super::trade::{ClosedTrade, ExitReason};

/// Stop-management phase. Phases only advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// 0 <= MFE < t1: distance stop from the adverse-excursion history.
    Initial = 1,
    /// t1 <= MFE < t2: stop anchored to structural pivots.
    Structural = 2,
    /// MFE >= t2: aggressive trailing.
    Trailing = 3,
}

impl Phase {
    pub fn number(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub playbook_id: PlaybookId,
    pub direction: Direction,
    pub entry_price: f64,
    pub opened_at: NaiveDateTime,
    pub initial_stop: f64,
    pub current_stop: f64,
    /// Initial stop distance in price (1R). Always > 0.
    pub risk: f64,
    /// At-risk capital fraction assigned by the sizing manager.
    pub size: f64,
    /// Remaining size fraction in (0, 1].
    pub remaining: f64,
    /// Maximum favorable excursion in R, >= 0.
    pub mfe: f64,
    /// Maximum adverse excursion in R, <= 0.
    pub mae: f64,
    pub phase: Phase,
    pub entry_regime: RegimeLabel,
    pub entry_factors: FactorVector,
    pub bars_held: u32,
    /// Bars since the MFE was last extended.
    pub bars_since_mfe: u32,
    /// Most favorable intrabar price since entry.
    pub favorable_extreme: f64,
    pub targets: Vec<ProfitTarget>,
    pub targets_fired: usize,
    /// Fraction-weighted R already realized by partial exits.
    pub realized_r: f64,
}

impl Position {
    /// Promote an accepted signal to a position.
    pub fn open(
        id: PositionId,
        signal: &Signal,
        size: f64,
        entry_regime: RegimeLabel,
        entry_factors: FactorVector,
    ) -> Self {
        Self {
            id,
            playbook_id: signal.playbook_id,
            direction: signal.direction,
            entry_price: signal.reference_price,
            opened_at: signal.timestamp,
            initial_stop: signal.initial_stop,
            current_stop: signal.initial_stop,
            risk: signal.risk(),
            size,
            remaining: 1.0,
            mfe: 0.0,
            mae: 0.0,
            phase: Phase::Initial,
            entry_regime,
            entry_factors,
            bars_held: 0,
            bars_since_mfe: 0,
            favorable_extreme: signal.reference_price,
            targets: signal.targets.clone(),
            targets_fired: 0,
            realized_r: 0.0,
        }
    }

    /// Price expressed in R relative to entry, signed by direction.
    pub fn r_at(&self, price: f64) -> f64 {
        if self.risk <= 0.0 {
            return 0.0;
        }
        (price - self.entry_price) * self.direction.sign() / self.risk
    }

    /// R of the unrealized part at a given price, weighted by remaining size.
    pub fn open_r_at(&self, price: f64) -> f64 {
        self.realized_r + self.remaining * self.r_at(price)
    }

    /// Extend MFE/MAE from the bar's favorable and adverse extremes.
    pub fn update_excursion(&mut self, bar: &Bar) {
        let (favorable, adverse) = match self.direction {
            Direction::Long => (bar.high, bar.low),
            Direction::Short => (bar.low, bar.high),
        };
        let extended = self.extend_excursion_to(favorable);
        self.extend_excursion_to(adverse);
        if extended {
            self.bars_since_mfe = 0;
        } else {
            self.bars_since_mfe += 1;
        }
    }

    /// Widen MFE/MAE to include `price`. Returns true if MFE grew.
    pub fn extend_excursion_to(&mut self, price: f64) -> bool {
        let r = self.r_at(price);
        let mut extended = false;
        if r > self.mfe {
            self.mfe = r;
            self.favorable_extreme = price;
            extended = true;
        }
        if r < self.mae {
            self.mae = r;
        }
        extended
    }

    /// Move to the phase implied by the current MFE. Never regresses.
    pub fn advance_phase(&mut self, t1: f64, t2: f64) -> Option<Phase> {
        let implied = if self.mfe >= t2 {
            Phase::Trailing
        } else if self.mfe >= t1 {
            Phase::Structural
        } else {
            Phase::Initial
        };
        if implied > self.phase {
            self.phase = implied;
            Some(implied)
        } else {
            None
        }
    }

    /// Set a new stop. Callers pass already-ratcheted levels.
    pub fn move_stop(&mut self, new_stop: f64) {
        self.current_stop = new_stop;
    }

    /// True if the bar's adverse extreme touches or crosses the current stop.
    pub fn stop_crossed(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.current_stop,
            Direction::Short => bar.high >= self.current_stop,
        }
    }

    /// Next unfired target, if any.
    pub fn next_target(&self) -> Option<&ProfitTarget> {
        self.targets.get(self.targets_fired)
    }

    /// True if the next unfired target is the last one in the schedule.
    pub fn on_final_target(&self) -> bool {
        self.targets_fired + 1 >= self.targets.len()
    }

    /// True if the bar's favorable extreme reaches `price`.
    pub fn reached(&self, bar: &Bar, price: f64) -> bool {
        match self.direction {
            Direction::Long => bar.high >= price,
            Direction::Short => bar.low <= price,
        }
    }

    /// Close `fraction` of the original size at `price`.
    pub fn partial_exit(&mut self, fraction: f64, price: f64) {
        let fraction = fraction.min(self.remaining);
        self.realized_r += fraction * self.r_at(price);
        self.remaining -= fraction;
        self.targets_fired += 1;
    }

    /// Sum of the fractions of targets fired so far.
    pub fn fired_fraction(&self) -> f64 {
        self.targets
            .iter()
            .take(self.targets_fired)
            .map(|t| t.fraction)
            .sum()
    }

    /// At-risk capital fraction still exposed.
    pub fn heat(&self) -> f64 {
        self.size * self.remaining
    }

    /// Full exit of the remaining fraction.
    pub fn close(self, exit_price: f64, exit_time: NaiveDateTime, reason: ExitReason) -> ClosedTrade {
        let realized_r = self.open_r_at(exit_price);
        ClosedTrade {
            position_id: self.id,
            playbook_id: self.playbook_id,
            direction: self.direction,
            entry_price: self.entry_price,
            entry_time: self.opened_at,
            exit_price,
            exit_time,
            exit_reason: reason,
            realized_r,
            mfe: self.mfe,
            mae: self.mae,
            entry_regime: self.entry_regime,
            size: self.size,
            bars_held: self.bars_held,
            entry_factors: self.entry_factors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn bar(minute: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts(minute), close, high, low, close, 1000.0)
    }

    fn long_position() -> Position {
        let signal = Signal {
            playbook_id: PlaybookId(1),
            timestamp: ts(0),
            direction: Direction::Long,
            reference_price: 100.0,
            initial_stop: 95.0,
            targets: vec![
                ProfitTarget {
                    price: 105.0,
                    fraction: 0.5,
                    r_multiple: 1.0,
                },
                ProfitTarget {
                    price: 110.0,
                    fraction: 0.5,
                    r_multiple: 2.0,
                },
            ],
            strength: 0.6,
            regime_alignment: 0.7,
        };
        Position::open(
            PositionId(1),
            &signal,
            0.01,
            RegimeLabel::Trend,
            FactorVector::default(),
        )
    }

    #[test]
    fn excursion_uses_intrabar_extremes() {
        let mut p = long_position();
        p.update_excursion(&bar(1, 107.0, 99.0, 101.0));
        assert!((p.mfe - 1.4).abs() < 1e-12);
        assert!((p.mae + 0.2).abs() < 1e-12);
        assert_eq!(p.favorable_extreme, 107.0);
        assert_eq!(p.bars_since_mfe, 0);

        p.update_excursion(&bar(2, 104.0, 101.0, 102.0));
        assert!((p.mfe - 1.4).abs() < 1e-12);
        assert_eq!(p.bars_since_mfe, 1);
    }

    #[test]
    fn short_excursion_is_mirrored() {
        let mut p = long_position();
        p.direction = Direction::Short;
        p.initial_stop = 105.0;
        p.current_stop = 105.0;
        p.update_excursion(&bar(1, 102.0, 96.0, 97.0));
        assert!((p.mfe - 0.8).abs() < 1e-12);
        assert!((p.mae + 0.4).abs() < 1e-12);
    }

    #[test]
    fn phase_only_advances() {
        let mut p = long_position();
        p.mfe = 0.7;
        assert_eq!(p.advance_phase(0.5, 1.2), Some(Phase::Structural));
        p.mfe = 0.2;
        assert_eq!(p.advance_phase(0.5, 1.2), None);
        assert_eq!(p.phase, Phase::Structural);
        p.mfe = 1.5;
        assert_eq!(p.advance_phase(0.5, 1.2), Some(Phase::Trailing));
        assert_eq!(p.phase.number(), 3);
    }

    #[test]
    fn partial_then_close_accounts_realized_r() {
        let mut p = long_position();
        p.update_excursion(&bar(1, 106.0, 100.0, 105.5));
        p.partial_exit(0.5, 105.0);
        assert!((p.remaining - 0.5).abs() < 1e-12);
        assert!((p.fired_fraction() - 0.5).abs() < 1e-12);
        assert!((p.heat() - 0.005).abs() < 1e-12);
        let trade = p.close(100.0, ts(2), ExitReason::Trail);
        assert!((trade.realized_r - 0.5).abs() < 1e-12);
        assert_eq!(trade.exit_reason, ExitReason::Trail);
    }

    #[test]
    fn stop_crossing() {
        let p = long_position();
        assert!(p.stop_crossed(&bar(1, 101.0, 95.0, 96.0)));
        assert!(!p.stop_crossed(&bar(1, 101.0, 95.5, 96.0)));
    }
}
