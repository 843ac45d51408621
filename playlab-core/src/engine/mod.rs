//! Decision engine: position lifecycle manager and simulation driver.
//!
//! Per bar, [`DecisionCore::on_bar`] runs:
//!
//! 1. Features, microstructure and regime for the bar
//! 2. Lifecycle for every open position, in fixed order: excursion → stop →
//!    salvage → order-flow exit → stop update → targets → time/session exit
//! 3. Entries: candidates from every eligible playbook → arbitration →
//!    sizing → admission
//! 4. Invariant checks
//!
//! [`run_simulation`] iterates a bar slice over a fresh core and contains no
//! trading logic of its own.

pub mod decision;
pub mod driver;
pub mod invariants;
pub mod lifecycle;
pub mod stats;

pub use decision::DecisionCore;
pub use driver::{run_simulation, SimulationResult};
pub use invariants::InvariantViolation;
pub use stats::CoreStats;

use chrono::NaiveDateTime;

use crate::domain::{PlaybookId, PositionId};

/// Runtime failures of the core. Data conditions never produce these; they
/// signal a broken caller contract or a defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("bar at {current} does not follow previous bar at {previous}")]
    OutOfOrder {
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
    #[error("bar at {0} has inconsistent or non-finite prices")]
    MalformedBar(NaiveDateTime),
    #[error("position {0} is already open")]
    DuplicatePosition(PositionId),
    #[error("no playbook registered with id {0}")]
    UnknownPlaybook(PlaybookId),
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}
