//! Portfolio and trade invariants.
//!
//! A violation is a defect, never a data condition. Every check logs at
//! error level before returning the violation.

use tracing::error;

use crate::domain::{ClosedTrade, Position, PositionId};
use crate::numeric::EPSILON;
use crate::sizing::open_heat;

/// Slack for floating-point comparisons against ceilings and envelopes.
pub const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{position}: exit at {exit_r}R (realized {realized_r}R) outside [MAE {mae}, MFE {mfe}]")]
    ExitOutsideExcursion {
        position: PositionId,
        exit_r: f64,
        realized_r: f64,
        mae: f64,
        mfe: f64,
    },
    #[error("portfolio heat {heat} exceeds ceiling {ceiling}")]
    HeatCeilingExceeded { heat: f64, ceiling: f64 },
    #[error("{open} open positions exceed ceiling {max}")]
    TooManyPositions { open: usize, max: usize },
    #[error("{position}: remaining fraction {remaining} outside (0, 1]")]
    RemainingFraction { position: PositionId, remaining: f64 },
    #[error("{position}: excursion envelope broken (MFE {mfe}, MAE {mae})")]
    ExcursionSign { position: PositionId, mfe: f64, mae: f64 },
}

/// Exit price and realized R both lie in [MAE, MFE].
pub fn check_closed_trade(trade: &ClosedTrade, risk: f64) -> Result<(), InvariantViolation> {
    let exit_r = if risk > EPSILON {
        (trade.exit_price - trade.entry_price) * trade.direction.sign() / risk
    } else {
        0.0
    };
    let inside = |r: f64| r >= trade.mae - TOLERANCE && r <= trade.mfe + TOLERANCE;
    if inside(exit_r) && trade.within_excursion(TOLERANCE) {
        return Ok(());
    }
    let violation = InvariantViolation::ExitOutsideExcursion {
        position: trade.position_id,
        exit_r,
        realized_r: trade.realized_r,
        mae: trade.mae,
        mfe: trade.mfe,
    };
    error!(%violation, reason = %trade.exit_reason, "invariant violation");
    Err(violation)
}

/// MFE ≥ 0 ≥ MAE and remaining ∈ (0, 1] for a still-open position.
pub fn check_position(position: &Position) -> Result<(), InvariantViolation> {
    if position.mfe < 0.0 || position.mae > 0.0 {
        let violation = InvariantViolation::ExcursionSign {
            position: position.id,
            mfe: position.mfe,
            mae: position.mae,
        };
        error!(%violation, "invariant violation");
        return Err(violation);
    }
    if position.remaining <= EPSILON || position.remaining > 1.0 + TOLERANCE {
        let violation = InvariantViolation::RemainingFraction {
            position: position.id,
            remaining: position.remaining,
        };
        error!(%violation, "invariant violation");
        return Err(violation);
    }
    Ok(())
}

/// Open count and total heat within their ceilings.
pub fn check_portfolio(positions: &[Position], max_open: usize, heat_ceiling: f64) -> Result<(), InvariantViolation> {
    if positions.len() > max_open {
        let violation = InvariantViolation::TooManyPositions {
            open: positions.len(),
            max: max_open,
        };
        error!(%violation, "invariant violation");
        return Err(violation);
    }
    let heat = open_heat(positions);
    if heat > heat_ceiling + TOLERANCE {
        let violation = InvariantViolation::HeatCeilingExceeded {
            heat,
            ceiling: heat_ceiling,
        };
        error!(%violation, "invariant violation");
        return Err(violation);
    }
    Ok(())
}
