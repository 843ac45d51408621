//! Stop ratchet.
//!
//! **Core rule:** stops may tighten, never loosen, even when volatility
//! expands or a later phase proposes a wider level.
//! - Long: stop can only rise (max of current and proposed)
//! - Short: stop can only fall (min of current and proposed)

use crate::domain::Direction;

/// Ratcheted stop level. Non-finite proposals are ignored.
pub fn tighten(direction: Direction, current: f64, proposed: f64) -> f64 {
    if !proposed.is_finite() {
        return current;
    }
    match direction {
        Direction::Long => current.max(proposed),
        Direction::Short => current.min(proposed),
    }
}

/// True if `candidate` is strictly tighter than `current`.
pub fn is_tighter(direction: Direction, current: f64, candidate: f64) -> bool {
    match direction {
        Direction::Long => candidate > current,
        Direction::Short => candidate < current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stop_can_tighten() {
        assert_eq!(tighten(Direction::Long, 95.0, 100.0), 100.0);
    }

    #[test]
    fn long_stop_cannot_loosen() {
        let level = tighten(Direction::Long, 100.0, 90.0);
        assert_eq!(level, 100.0);
    }

    #[test]
    fn short_stop_can_tighten() {
        assert_eq!(tighten(Direction::Short, 105.0, 100.0), 100.0);
    }

    #[test]
    fn short_stop_cannot_loosen() {
        assert_eq!(tighten(Direction::Short, 100.0, 110.0), 100.0);
    }

    #[test]
    fn volatility_trap_prevented() {
        // stop at 95 from a narrow ATR; ATR doubles and proposes 90
        let level = tighten(Direction::Long, 95.0, 90.0);
        assert_eq!(level, 95.0);
    }

    #[test]
    fn nan_proposal_is_ignored() {
        assert_eq!(tighten(Direction::Long, 95.0, f64::NAN), 95.0);
        assert_eq!(tighten(Direction::Short, 105.0, f64::INFINITY), 105.0);
    }

    #[test]
    fn tighter_is_strict() {
        assert!(is_tighter(Direction::Long, 95.0, 95.5));
        assert!(!is_tighter(Direction::Long, 95.0, 95.0));
        assert!(is_tighter(Direction::Short, 105.0, 104.0));
    }
}
