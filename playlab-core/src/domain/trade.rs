//! ClosedTrade — append-only record of a fully exited position.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::factors::FactorVector;
use super::ids::{PlaybookId, PositionId};
use super::regime::RegimeLabel;
use super::signal::Direction;

/// Why a position (or its last fraction) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Hard stop hit while still in phase 1.
    Stop,
    /// Hard stop hit after the stop started trailing (phase 2 or 3).
    Trail,
    Salvage,
    OfiReversal,
    LargeOrderWall,
    /// Final target of the schedule filled.
    Target,
    TimeStop,
    SessionClose,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Stop => "STOP",
            ExitReason::Trail => "TRAIL",
            ExitReason::Salvage => "SALVAGE",
            ExitReason::OfiReversal => "OFI_REVERSAL",
            ExitReason::LargeOrderWall => "LARGE_ORDER_WALL",
            ExitReason::Target => "TARGET",
            ExitReason::TimeStop => "TIME_STOP",
            ExitReason::SessionClose => "SESSION_CLOSE",
            ExitReason::EndOfData => "END_OF_DATA",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: PositionId,
    pub playbook_id: PlaybookId,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_reason: ExitReason,
    /// Size-fraction-weighted R across all partial and final exits.
    pub realized_r: f64,
    pub mfe: f64,
    pub mae: f64,
    pub entry_regime: RegimeLabel,
    pub size: f64,
    pub bars_held: u32,
    pub entry_factors: FactorVector,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.realized_r > 0.0
    }

    pub fn entry_hour(&self) -> u32 {
        self.entry_time.hour()
    }

    /// Realized R lies within the excursion envelope (inclusive, with tolerance).
    pub fn within_excursion(&self, tolerance: f64) -> bool {
        self.realized_r >= self.mae - tolerance && self.realized_r <= self.mfe + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_reason_wire_names() {
        let json = serde_json::to_string(&ExitReason::OfiReversal).unwrap();
        assert_eq!(json, "\"OFI_REVERSAL\"");
        assert_eq!(ExitReason::LargeOrderWall.to_string(), "LARGE_ORDER_WALL");
    }
}
