//! Simulation driver: feeds a bar slice through a core.
//!
//! No trading logic lives here: the driver resolves the snapshot for each
//! bar, calls [`DecisionCore::on_bar`] with the bars before it as history,
//! and flattens whatever is still open after the last bar.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, ClosedTrade, ExitReason, RegimeAssignment, TimedAction};
use crate::microstructure::SnapshotSource;

use super::{CoreError, CoreStats, DecisionCore};

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Action log in emission order.
    pub actions: Vec<TimedAction>,
    pub trades: Vec<ClosedTrade>,
    /// One assignment per bar.
    pub regimes: Vec<RegimeAssignment>,
    pub stats: CoreStats,
}

/// Run `bars` through `core`, closing any open position at the last bar with
/// END_OF_DATA.
pub fn run_simulation(
    core: &mut DecisionCore,
    bars: &[Bar],
    snapshots: &dyn SnapshotSource,
) -> Result<SimulationResult, CoreError> {
    let tolerance = core.config().lifecycle.snapshot_tolerance();
    let first_trade = core.closed_trades().len();
    let mut actions = Vec::new();
    let mut regimes = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let snapshot = snapshots.get_snapshot(bar.timestamp, tolerance);
        let emitted = core.on_bar(bar, &bars[..i], snapshot)?;
        actions.extend(emitted.into_iter().map(|action| TimedAction {
            timestamp: bar.timestamp,
            action,
        }));
        if let Some(regime) = core.last_regime() {
            regimes.push(*regime);
        }
    }

    if let Some(last) = bars.last() {
        let flattened = core.flatten(last, ExitReason::EndOfData)?;
        actions.extend(flattened.into_iter().map(|action| TimedAction {
            timestamp: last.timestamp,
            action,
        }));
    }

    let stats = core.get_stats();
    debug!(
        bars = bars.len(),
        actions = actions.len(),
        trades = stats.counters.closed_trades,
        "simulation finished"
    );
    Ok(SimulationResult {
        actions,
        trades: core.closed_trades()[first_trade..].to_vec(),
        regimes,
        stats,
    })
}
