//! Trend continuation: channel breakout confirmed by directional commitment.
//!
//! Long when the close clears the highest high of the prior
//! `breakout_lookback` bars and commitment ≥ `min_commitment`; short mirrored.
//! strength = ½·|commitment| + ½·min(breakout distance / ATR, 1)

use crate::domain::{Direction, PlaybookId, RegimeLabel};
use crate::playbook::params::{PlaybookParams, StopParams, TargetSpec};
use crate::playbook::{EntryContext, Playbook, Setup};

use super::channel;

pub const NAME: &str = "trend_continuation";

#[derive(Debug, Clone)]
pub struct TrendContinuation {
    id: PlaybookId,
    params: PlaybookParams,
    breakout_lookback: usize,
    min_commitment: f64,
}

impl TrendContinuation {
    pub fn new(id: PlaybookId, params: PlaybookParams) -> Self {
        let breakout_lookback = params.setup_param_usize("breakout_lookback", 20);
        let min_commitment = params.setup_param("min_commitment", 0.3);
        Self {
            id,
            params,
            breakout_lookback,
            min_commitment,
        }
    }

    pub fn default_params() -> PlaybookParams {
        PlaybookParams {
            preferred_regimes: vec![RegimeLabel::Trend],
            stops: StopParams {
                t1: 0.5,
                t2: 1.2,
                trail_distance_r: 1.0,
                ..StopParams::default()
            },
            targets: vec![
                TargetSpec::new(1.0, 0.25),
                TargetSpec::new(2.0, 0.35),
                TargetSpec::new(3.5, 0.40),
            ],
            ..PlaybookParams::default()
        }
    }
}

impl Playbook for TrendContinuation {
    fn id(&self) -> PlaybookId {
        self.id
    }

    fn name(&self) -> &str {
        NAME
    }

    fn params(&self) -> &PlaybookParams {
        &self.params
    }

    fn detect_setup(&self, ctx: &EntryContext<'_>, atr: f64) -> Option<Setup> {
        let (high, low) = channel(ctx.history, self.breakout_lookback)?;
        let commitment = ctx.features.directional_commitment?;
        let close = ctx.bar.close;

        let (direction, distance) = if close > high && commitment >= self.min_commitment {
            (Direction::Long, close - high)
        } else if close < low && commitment <= -self.min_commitment {
            (Direction::Short, low - close)
        } else {
            return None;
        };

        let strength = 0.5 * commitment.abs().min(1.0) + 0.5 * (distance / atr).min(1.0);
        Some(Setup {
            direction,
            strength,
            reference_price: close,
            stop: None,
        })
    }
}
