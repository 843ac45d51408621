//! Property tests for core invariants.
//!
//! Uses proptest to verify:
//! 1. Heat ceiling and position cap hold across whole randomized sessions
//! 2. Remaining-fraction accounting across partial exits
//! 3. Exit price and realized R stay inside [MAE, MFE] on random bar paths
//! 4. Ratchet monotonicity: stops only tighten

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use playlab_core::domain::{
    Action, Bar, Direction, FactorVector, PlaybookId, Position, PositionId, RegimeLabel, Signal,
};
use playlab_core::engine::invariants::{check_closed_trade, check_position};
use playlab_core::engine::lifecycle::{manage, BarContext, Outcome};
use playlab_core::microstructure::SnapshotIndex;
use playlab_core::playbook::ratchet::tighten;
use playlab_core::playbook::{create_playbook, Playbook, PlaybookConfig, PlaybookKind, PlaybookStats};
use playlab_core::synthetic::{reference_regime_model, snapshots_for, SyntheticMarket};
use playlab_core::{run_simulation, CoreConfig, DecisionCore};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

fn arb_kind() -> impl Strategy<Value = PlaybookKind> {
    prop::sample::select(PlaybookKind::ALL.to_vec())
}

fn arb_label() -> impl Strategy<Value = RegimeLabel> {
    prop::sample::select(RegimeLabel::ALL.to_vec())
}

/// (close change, upper wick, lower wick) per bar.
fn arb_path() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-1.5..1.5_f64, 0.0..1.0_f64, 0.0..1.0_f64), 1..80)
}

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn bars_from_path(path: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut prev = 100.0_f64;
    path.iter()
        .enumerate()
        .map(|(i, &(change, up, down))| {
            let close = prev + change;
            let bar = Bar::new(
                start() + Duration::minutes(i as i64 + 1),
                prev,
                prev.max(close) + up,
                prev.min(close) - down,
                close,
                1000.0,
            );
            prev = close;
            bar
        })
        .collect()
}

fn position(kind: PlaybookKind, direction: Direction, risk: f64) -> (Position, Box<dyn Playbook>) {
    let playbook = create_playbook(&PlaybookConfig::new(1, kind));
    let signal = Signal {
        playbook_id: PlaybookId(1),
        timestamp: start(),
        direction,
        reference_price: 100.0,
        initial_stop: 100.0 - direction.sign() * risk,
        targets: playbook.profit_targets(100.0, direction, risk),
        strength: 0.5,
        regime_alignment: 0.5,
    };
    let position = Position::open(PositionId(1), &signal, 0.01, RegimeLabel::Trend, FactorVector::default());
    (position, playbook)
}

// ── 1. Portfolio ceilings ────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Any invariant breach surfaces as an error from the run; the recorded
    /// peak heat never exceeds the ceiling.
    #[test]
    fn sessions_respect_heat_and_position_ceilings(
        seed in any::<u64>(),
        labels in prop::collection::vec(arb_label(), 2..6),
        heat_ceiling in 0.01..0.05_f64,
        max_open in 1usize..4,
        with_book in any::<bool>(),
    ) {
        let (bars, _) = SyntheticMarket::new(seed, 100.0).session(&labels, 50);
        let mut config = CoreConfig::new(reference_regime_model());
        config.sizing.heat_ceiling = heat_ceiling;
        config.lifecycle.max_open_positions = max_open;
        for pb in &mut config.playbooks {
            let mut params = pb.effective_params();
            params.preferred_regimes = RegimeLabel::ALL.to_vec();
            pb.params = Some(params);
        }
        let snapshots: SnapshotIndex = if with_book {
            snapshots_for(&bars, seed, 5, 500.0).into_iter().collect()
        } else {
            SnapshotIndex::default()
        };

        let mut core = DecisionCore::new(config).unwrap();
        let result = match run_simulation(&mut core, &bars, &snapshots) {
            Ok(result) => result,
            Err(e) => return Err(TestCaseError::fail(format!("run failed: {e}"))),
        };
        prop_assert!(result.stats.counters.peak_heat <= heat_ceiling + 1e-9);
        prop_assert_eq!(result.stats.open_positions, 0);
        for trade in &result.trades {
            prop_assert!(trade.realized_r >= trade.mae - 1e-9);
            prop_assert!(trade.realized_r <= trade.mfe + 1e-9);
        }
    }
}

// ── 2 & 3. Lifecycle accounting on random paths ──────────────────────

proptest! {
    /// While open, remaining equals one minus the partial fractions fired;
    /// at close, exit price and realized R lie in the excursion envelope.
    #[test]
    fn lifecycle_accounting_on_random_paths(
        kind in arb_kind(),
        direction in arb_direction(),
        risk in 0.5..3.0_f64,
        path in arb_path(),
    ) {
        let (mut open, playbook) = position(kind, direction, risk);
        let bars = bars_from_path(&path);
        let stats = PlaybookStats::default();
        let mut partials = 0.0_f64;

        for (i, bar) in bars.iter().enumerate() {
            let ctx = BarContext {
                bar,
                history: &bars[..i],
                atr: Some(1.0),
                micro: None,
                session_closed: false,
            };
            let mut actions = Vec::new();
            match manage(open, playbook.as_ref(), &stats, &ctx, &mut actions) {
                Outcome::Open(p) => {
                    for action in &actions {
                        if let Action::PartialExit { fraction, .. } = action {
                            partials += *fraction;
                        }
                    }
                    prop_assert!(check_position(&p).is_ok());
                    prop_assert!((p.remaining - (1.0 - partials)).abs() < 1e-9);
                    open = p;
                }
                Outcome::Closed(trade, risk) => {
                    prop_assert!(check_closed_trade(&trade, risk).is_ok());
                    prop_assert!(
                        matches!(actions.last(), Some(Action::Exit { .. })),
                        "last action must be an exit"
                    );
                    return Ok(());
                }
            }
        }
        prop_assert!(check_position(&open).is_ok());
    }

    /// Every stop update emitted by the lifecycle tightens the stop.
    #[test]
    fn emitted_stop_updates_only_tighten(
        kind in arb_kind(),
        direction in arb_direction(),
        risk in 0.5..3.0_f64,
        path in arb_path(),
    ) {
        let (mut open, playbook) = position(kind, direction, risk);
        let bars = bars_from_path(&path);
        let stats = PlaybookStats::default();
        let mut stop = open.current_stop;

        for (i, bar) in bars.iter().enumerate() {
            let ctx = BarContext {
                bar,
                history: &bars[..i],
                atr: Some(1.0),
                micro: None,
                session_closed: false,
            };
            let mut actions = Vec::new();
            let outcome = manage(open, playbook.as_ref(), &stats, &ctx, &mut actions);
            for action in &actions {
                if let Action::UpdateStop { new_stop, .. } = action {
                    prop_assert!((new_stop - stop) * direction.sign() > 0.0);
                    stop = *new_stop;
                }
            }
            match outcome {
                Outcome::Open(p) => open = p,
                Outcome::Closed(..) => break,
            }
        }
    }
}

// ── 4. Ratchet ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ratchet_never_loosens(
        direction in arb_direction(),
        start_stop in 50.0..150.0_f64,
        proposals in prop::collection::vec(prop_oneof![
            50.0..150.0_f64,
            Just(f64::NAN),
            Just(f64::INFINITY),
        ], 1..40),
    ) {
        let mut stop = start_stop;
        for proposal in proposals {
            let next = tighten(direction, stop, proposal);
            prop_assert!((next - stop) * direction.sign() >= 0.0);
            stop = next;
        }
    }
}
