//! Per-position bar management.
//!
//! Fixed order, first exit wins:
//!
//! 1. Extend MFE/MAE from the bar's intrabar extremes
//! 2. Hard stop: adverse extreme crosses the stop → exit at the stop price
//!    (STOP in phase 1, TRAIL after)
//! 3. Salvage → exit at the close
//! 4. Order-flow reversal or opposing wall → exit at the close
//! 5. Phase advance and ratcheted stop update
//! 6. Due profit targets, in schedule order; the last one closes
//! 7. Time stop, then session close → exit at the close

use tracing::debug;

use crate::domain::{Action, Bar, ClosedTrade, ExitReason, Phase, Position};
use crate::microstructure::MicrostructureFeatures;
use crate::numeric::EPSILON;
use crate::playbook::{Playbook, PlaybookStats, StopContext};

/// Market state shared by every position on one bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar: &'a Bar,
    pub history: &'a [Bar],
    pub atr: Option<f64>,
    /// `None` when no snapshot was resolved.
    pub micro: Option<&'a MicrostructureFeatures>,
    /// The bar is at or after the configured session close.
    pub session_closed: bool,
}

/// What became of a position on this bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Open(Position),
    /// The closed trade and the position's initial risk in price.
    Closed(ClosedTrade, f64),
}

/// Run the lifecycle for one position, appending actions in order.
pub fn manage(
    mut position: Position,
    playbook: &dyn Playbook,
    stats: &PlaybookStats,
    ctx: &BarContext<'_>,
    actions: &mut Vec<Action>,
) -> Outcome {
    let bar = ctx.bar;
    position.bars_held += 1;
    position.update_excursion(bar);

    if position.stop_crossed(bar) {
        let price = position.current_stop;
        position.extend_excursion_to(price);
        let reason = if position.phase == Phase::Initial {
            ExitReason::Stop
        } else {
            ExitReason::Trail
        };
        return exit(position, price, reason, bar, actions);
    }

    let stop_ctx = StopContext {
        history: ctx.history,
        bar,
        atr: ctx.atr,
        stats,
    };
    if playbook.check_salvage(&position, &stop_ctx) {
        return exit(position, bar.close, ExitReason::Salvage, bar, actions);
    }

    if let Some(micro) = ctx.micro {
        if let Some(reason) = playbook.check_order_flow_exit(&position, micro) {
            return exit(position, bar.close, reason, bar, actions);
        }
    }

    let stops = &playbook.params().stops;
    if let Some(phase) = position.advance_phase(stops.t1, stops.t2) {
        debug!(position = %position.id, phase = phase.number(), mfe = position.mfe, "phase advanced");
    }
    let new_stop = playbook.update_stop(&position, &stop_ctx);
    if (new_stop - position.current_stop).abs() > EPSILON {
        position.move_stop(new_stop);
        actions.push(Action::UpdateStop {
            position_id: position.id,
            new_stop,
        });
    }

    while let Some(target) = position.next_target().copied() {
        if !position.reached(bar, target.price) {
            break;
        }
        if position.on_final_target() {
            return exit(position, target.price, ExitReason::Target, bar, actions);
        }
        let fraction = target.fraction.min(position.remaining);
        position.partial_exit(fraction, target.price);
        debug!(
            position = %position.id,
            price = target.price,
            fraction,
            remaining = position.remaining,
            "partial exit"
        );
        actions.push(Action::PartialExit {
            position_id: position.id,
            price: target.price,
            fraction,
        });
    }

    if let Some(max_bars) = playbook.params().max_bars_held {
        if position.bars_held >= max_bars {
            return exit(position, bar.close, ExitReason::TimeStop, bar, actions);
        }
    }
    if ctx.session_closed {
        return exit(position, bar.close, ExitReason::SessionClose, bar, actions);
    }

    Outcome::Open(position)
}

/// Close the remaining fraction at `price`.
pub fn exit(position: Position, price: f64, reason: ExitReason, bar: &Bar, actions: &mut Vec<Action>) -> Outcome {
    let risk = position.risk;
    actions.push(Action::Exit {
        position_id: position.id,
        price,
        reason,
    });
    let trade = position.close(price, bar.timestamp, reason);
    debug!(
        position = %trade.position_id,
        playbook = %trade.playbook_id,
        %reason,
        price,
        realized_r = trade.realized_r,
        "position closed"
    );
    Outcome::Closed(trade, risk)
}
