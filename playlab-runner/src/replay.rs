//! Replay runs and action-stream fingerprints.
//!
//! A fingerprint is the BLAKE3 hash of the JSON-serialized timed action log.
//! Two runs agree exactly when their fingerprints do; [`first_divergence`]
//! locates the first differing action when they don't.

use anyhow::{Context, Result};
use playlab_core::domain::{Bar, TimedAction};
use playlab_core::microstructure::SnapshotSource;
use playlab_core::{run_simulation, CoreConfig, DecisionCore, SimulationResult};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Hex BLAKE3 of the action log.
    pub fingerprint: String,
    /// Hash of the configuration the run used.
    pub config_hash: String,
    pub result: SimulationResult,
}

/// Build a fresh core from `config` and run it over `bars`.
pub fn replay(config: CoreConfig, bars: &[Bar], snapshots: &dyn SnapshotSource) -> Result<ReplayReport> {
    let config_hash = config.config_hash().context("hashing replay config")?;
    let mut core = DecisionCore::new(config).context("building decision core")?;
    let result = run_simulation(&mut core, bars, snapshots).context("running simulation")?;
    let fingerprint = fingerprint_actions(&result.actions)?;
    info!(
        bars = bars.len(),
        actions = result.actions.len(),
        trades = result.trades.len(),
        fingerprint = %&fingerprint[..12],
        "replay finished"
    );
    Ok(ReplayReport {
        fingerprint,
        config_hash,
        result,
    })
}

pub fn fingerprint_actions(actions: &[TimedAction]) -> Result<String> {
    let json = serde_json::to_vec(actions).context("serializing action log")?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// Index of the first action where the two logs differ, including one log
/// ending early.
pub fn first_divergence(a: &[TimedAction], b: &[TimedAction]) -> Option<usize> {
    a.iter()
        .zip(b.iter())
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use playlab_core::domain::{Action, ExitReason, PositionId};

    fn exit(minute: u32, price: f64) -> TimedAction {
        TimedAction {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
            action: Action::Exit {
                position_id: PositionId(1),
                price,
                reason: ExitReason::SessionClose,
            },
        }
    }

    #[test]
    fn fingerprint_is_hex_and_stable() {
        let log = vec![exit(0, 100.0)];
        let a = fingerprint_actions(&log).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint_actions(&log).unwrap());
        assert_ne!(a, fingerprint_actions(&[exit(0, 100.5)]).unwrap());
    }

    #[test]
    fn divergence_points_at_first_difference() {
        let a = vec![exit(0, 100.0), exit(1, 101.0)];
        let b = vec![exit(0, 100.0), exit(1, 102.0)];
        assert_eq!(first_divergence(&a, &b), Some(1));
        assert_eq!(first_divergence(&a, &a), None);
        assert_eq!(first_divergence(&a, &a[..1]), Some(1));
    }
}
