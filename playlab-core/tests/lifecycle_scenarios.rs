//! Lifecycle scenarios driven through the public `DecisionCore` API.
//!
//! Positions are adopted into a core with a short bar history, so features
//! are not usable and no entries compete with the scenario under test.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use playlab_core::domain::{
    Action, Bar, BookLevel, Direction, ExitReason, FactorVector, OrderBookSnapshot, PlaybookId,
    Position, PositionId, RegimeLabel, Signal,
};
use playlab_core::playbook::{PlaybookConfig, PlaybookKind, TargetSpec};
use playlab_core::synthetic::reference_regime_model;
use playlab_core::{CoreConfig, DecisionCore};

// ── Helpers ──────────────────────────────────────────────────────────

fn ts(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(10, minute, 0)
        .unwrap()
}

fn bar(minute: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    let b = Bar::new(ts(minute), open, high, low, close, 1000.0);
    assert!(b.is_sane(), "fixture bar at minute {minute} is not a valid OHLC bar");
    b
}

fn core_with_targets(targets: Vec<TargetSpec>) -> DecisionCore {
    let mut params = PlaybookKind::TrendContinuation.default_params();
    params.targets = targets;
    let mut config = CoreConfig::new(reference_regime_model());
    config.playbooks = vec![PlaybookConfig::new(1, PlaybookKind::TrendContinuation).with_params(params)];
    DecisionCore::new(config).unwrap()
}

/// Long at 100 with the stop at 95 (1R = 5).
fn long_position(core: &DecisionCore) -> Position {
    let targets = core
        .registry()
        .get(PlaybookId(1))
        .unwrap()
        .profit_targets(100.0, Direction::Long, 5.0);
    let signal = Signal {
        playbook_id: PlaybookId(1),
        timestamp: ts(0),
        direction: Direction::Long,
        reference_price: 100.0,
        initial_stop: 95.0,
        targets,
        strength: 0.6,
        regime_alignment: 0.6,
    };
    Position::open(PositionId(1), &signal, 0.01, RegimeLabel::Trend, FactorVector::default())
}

/// Drive bars one by one, each seeing the previous ones as history.
fn drive(core: &mut DecisionCore, bars: &[Bar], snapshots: &[Option<OrderBookSnapshot>]) -> Vec<Vec<Action>> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let snap = snapshots.get(i).and_then(|s| s.as_ref());
            core.on_bar(b, &bars[..i], snap).unwrap()
        })
        .collect()
}

// ── Exits ────────────────────────────────────────────────────────────

#[test]
fn trailing_stop_exit_after_phase_three() {
    let mut core = core_with_targets(vec![TargetSpec::new(3.0, 1.0)]);
    let position = long_position(&core);
    core.adopt_position(position).unwrap();

    let bars = [
        // MFE 1.4R → phase 3, trail to 107 - 5 = 102
        bar(1, 100.0, 107.0, 100.0, 106.0),
        // low 101 crosses the trailed stop
        bar(2, 103.0, 103.0, 101.0, 101.5),
    ];
    let actions = drive(&mut core, &bars, &[]);

    assert_eq!(
        actions[0],
        vec![Action::UpdateStop {
            position_id: PositionId(1),
            new_stop: 102.0
        }]
    );
    assert_eq!(
        actions[1],
        vec![Action::Exit {
            position_id: PositionId(1),
            price: 102.0,
            reason: ExitReason::Trail
        }]
    );
    let trade = &core.closed_trades()[0];
    assert!((trade.realized_r - 0.4).abs() < 1e-9);
    assert!((trade.mfe - 1.4).abs() < 1e-9);
    assert_eq!(trade.mae, 0.0);
    assert_eq!(trade.bars_held, 2);
}

#[test]
fn salvage_exit_after_sharp_retracement() {
    let mut core = core_with_targets(vec![TargetSpec::new(3.0, 1.0)]);
    core.adopt_position(long_position(&core)).unwrap();

    let bars = [
        bar(1, 100.0, 104.0, 100.0, 103.5),
        // gives back most of the 0.8R run-up
        bar(2, 103.5, 103.6, 100.4, 100.5),
    ];
    let actions = drive(&mut core, &bars, &[]);

    assert!(actions[0].is_empty());
    assert_eq!(
        actions[1],
        vec![Action::Exit {
            position_id: PositionId(1),
            price: 100.5,
            reason: ExitReason::Salvage
        }]
    );
    let trade = &core.closed_trades()[0];
    assert!((trade.realized_r - 0.1).abs() < 1e-9);
    assert!(trade.realized_r <= trade.mfe && trade.realized_r >= trade.mae);
}

#[test]
fn order_flow_reversal_preempts_targets() {
    let mut core = core_with_targets(vec![TargetSpec::new(1.0, 0.5), TargetSpec::new(3.0, 0.5)]);
    core.adopt_position(long_position(&core)).unwrap();

    let bars = [
        bar(1, 100.0, 102.0, 100.0, 101.5),
        // high 105.5 reaches the 1R target at 105, but sellers dominate the book
        bar(2, 101.5, 105.5, 101.0, 104.0),
    ];
    let ask_heavy = OrderBookSnapshot::new(
        ts(2),
        vec![BookLevel::new(103.99, 100.0, 2)],
        vec![BookLevel::new(104.01, 400.0, 6)],
    );
    let actions = drive(&mut core, &bars, &[None, Some(ask_heavy)]);

    assert!(actions[0].is_empty());
    assert_eq!(
        actions[1],
        vec![Action::Exit {
            position_id: PositionId(1),
            price: 104.0,
            reason: ExitReason::OfiReversal
        }]
    );
    assert!((core.closed_trades()[0].realized_r - 0.8).abs() < 1e-9);
}

#[test]
fn partial_then_final_target() {
    let mut core = core_with_targets(vec![TargetSpec::new(1.0, 0.5), TargetSpec::new(2.0, 0.5)]);
    core.adopt_position(long_position(&core)).unwrap();

    let bars = [
        bar(1, 100.0, 105.5, 100.0, 105.0),
        bar(2, 105.0, 110.5, 104.5, 110.0),
    ];
    let actions = drive(&mut core, &bars, &[]);

    assert!(actions[0].contains(&Action::PartialExit {
        position_id: PositionId(1),
        price: 105.0,
        fraction: 0.5
    }));
    assert!(matches!(
        actions[1].last(),
        Some(Action::Exit {
            reason: ExitReason::Target,
            ..
        })
    ));
    let trade = &core.closed_trades()[0];
    // ½ × 1R + ½ × 2R
    assert!((trade.realized_r - 1.5).abs() < 1e-9);
}

#[test]
fn session_close_exits_and_blocks_entries() {
    let mut config = CoreConfig::new(reference_regime_model());
    config.lifecycle.session_close = NaiveTime::from_hms_opt(10, 1, 0);
    let mut core = DecisionCore::new(config).unwrap();
    let mut position = long_position(&core);
    position.targets.clear();
    core.adopt_position(position).unwrap();

    let bars = [bar(1, 100.0, 100.6, 99.6, 100.2)];
    let actions = drive(&mut core, &bars, &[]);
    assert_eq!(
        actions[0],
        vec![Action::Exit {
            position_id: PositionId(1),
            price: 100.2,
            reason: ExitReason::SessionClose
        }]
    );
    assert!(core.open_positions().is_empty());
}

#[test]
fn adopted_position_counts_toward_heat() {
    let mut core = core_with_targets(vec![TargetSpec::new(3.0, 1.0)]);
    let mut position = long_position(&core);
    position.id = PositionId(41);
    core.adopt_position(position).unwrap();
    let stats = core.get_stats();
    assert_eq!(stats.open_positions, 1);
    assert!((stats.open_heat - 0.01).abs() < 1e-12);
}

// ── Entries ──────────────────────────────────────────────────────────

/// A steady climb that never clears the prior channel, then a breakout bar.
fn breakout_path() -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let mut bars = Vec::new();
    let mut prev = 100.0;
    for i in 0..40 {
        let close = 100.0 + 0.5 * i as f64;
        bars.push(Bar::new(
            start + chrono::Duration::minutes(i),
            prev,
            close + 1.0,
            prev.min(close) - 1.0,
            close,
            1000.0,
        ));
        prev = close;
    }
    let close = prev + 5.0;
    bars.push(Bar::new(
        start + chrono::Duration::minutes(40),
        prev,
        close + 0.5,
        prev - 0.5,
        close,
        1000.0,
    ));
    bars
}

#[test]
fn breakout_is_admitted_as_a_sized_position() {
    let mut params = PlaybookKind::TrendContinuation.default_params();
    params.preferred_regimes = RegimeLabel::ALL.to_vec();
    let mut config = CoreConfig::new(reference_regime_model());
    config.playbooks = vec![PlaybookConfig::new(1, PlaybookKind::TrendContinuation).with_params(params)];
    let mut core = DecisionCore::new(config).unwrap();

    let bars = breakout_path();
    let actions = drive(&mut core, &bars, &[]);

    assert!(actions[..bars.len() - 1].iter().all(|a| a.is_empty()));
    let last = actions.last().unwrap();
    assert_eq!(last.len(), 1);
    match &last[0] {
        Action::Enter { signal, size, .. } => {
            assert_eq!(signal.playbook_id, PlaybookId(1));
            assert_eq!(signal.direction, Direction::Long);
            assert!(signal.initial_stop < signal.reference_price);
            assert!(*size > 0.0 && *size <= core.config().sizing.heat_ceiling);
        }
        other => panic!("expected an entry, got {other:?}"),
    }
    let stats = core.get_stats();
    assert_eq!(stats.counters.entries, 1);
    assert_eq!(stats.counters.signals_selected, 1);
    assert_eq!(core.open_positions().len(), 1);
}
