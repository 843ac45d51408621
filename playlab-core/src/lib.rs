//! PlayLab Core — the decision core of an intraday multi-playbook simulator.
//!
//! This crate contains everything that turns a bar stream into trade intents:
//! - Domain types (bars, book snapshots, signals, positions, closed trades, actions)
//! - Feature engine over a trailing bar window
//! - Microstructure features over order-book snapshots
//! - Frozen regime classifier (standardize → project → Gaussian mixture)
//! - Playbook contract, four variants and an id-keyed registry
//! - Signal arbitration with adaptive factor weights
//! - Portfolio sizing under a heat ceiling
//! - Position lifecycle manager and the simulation driver
//!
//! The core is single-threaded and deterministic: identical inputs produce an
//! identical action sequence.

pub mod arbitration;
pub mod config;
pub mod domain;
pub mod engine;
pub mod features;
pub mod microstructure;
pub mod numeric;
pub mod playbook;
pub mod regime;
pub mod sizing;
pub mod synthetic;

pub use config::{CoreConfig, ConfigError};
pub use engine::{run_simulation, CoreError, DecisionCore, SimulationResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the core and everything it owns can move to a
    /// worker thread, so a multi-instrument host can run one core per thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::OrderBookSnapshot>();
        require_sync::<domain::OrderBookSnapshot>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();
        require_send::<domain::Action>();
        require_sync::<domain::Action>();

        require_send::<regime::RegimeClassifier>();
        require_sync::<regime::RegimeClassifier>();
        require_send::<playbook::PlaybookRegistry>();
        require_sync::<playbook::PlaybookRegistry>();
        require_send::<arbitration::Arbitrator>();
        require_sync::<arbitration::Arbitrator>();
        require_send::<DecisionCore>();
        require_sync::<DecisionCore>();
    }

    /// Architecture contract: playbooks reach positions only through the
    /// `&[Position]` slice in the entry context and never hold a handle to one.
    #[test]
    fn playbook_entry_context_borrows_positions_immutably() {
        fn _check<'a>(ctx: &playbook::EntryContext<'a>) -> &'a [domain::Position] {
            ctx.open_positions
        }
    }
}
