//! Actions: the intents the core emits for an external executor.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ids::PositionId;
use super::signal::Signal;
use super::trade::ExitReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Enter {
        position_id: PositionId,
        signal: Signal,
        size: f64,
    },
    PartialExit {
        position_id: PositionId,
        price: f64,
        /// Fraction of the original size closed.
        fraction: f64,
    },
    Exit {
        position_id: PositionId,
        price: f64,
        reason: ExitReason,
    },
    UpdateStop {
        position_id: PositionId,
        new_stop: f64,
    },
}

impl Action {
    pub fn position_id(&self) -> PositionId {
        match self {
            Action::Enter { position_id, .. }
            | Action::PartialExit { position_id, .. }
            | Action::Exit { position_id, .. }
            | Action::UpdateStop { position_id, .. } => *position_id,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Action::Exit { .. })
    }
}

/// An action stamped with the bar that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub action: Action,
}
