//! Transition breakout: leave a compression box.
//!
//! The prior `box_lookback` bars must fit inside `max_box_atr × ATR`. A close
//! outside the box opens in that direction with the stop at the box midpoint.

use crate::domain::{Direction, PlaybookId, RegimeLabel};
use crate::numeric::EPSILON;
use crate::playbook::params::{PlaybookParams, StopParams, TargetSpec};
use crate::playbook::{EntryContext, Playbook, Setup};

use super::channel;

pub const NAME: &str = "transition_breakout";

#[derive(Debug, Clone)]
pub struct TransitionBreakout {
    id: PlaybookId,
    params: PlaybookParams,
    box_lookback: usize,
    max_box_atr: f64,
}

impl TransitionBreakout {
    pub fn new(id: PlaybookId, params: PlaybookParams) -> Self {
        Self {
            id,
            box_lookback: params.setup_param_usize("box_lookback", 12),
            max_box_atr: params.setup_param("max_box_atr", 3.0),
            params,
        }
    }

    pub fn default_params() -> PlaybookParams {
        PlaybookParams {
            preferred_regimes: vec![RegimeLabel::Transitional],
            stops: StopParams {
                t1: 0.5,
                t2: 1.0,
                trail_distance_r: 0.8,
                ..StopParams::default()
            },
            targets: vec![TargetSpec::new(1.0, 0.5), TargetSpec::new(2.0, 0.5)],
            ..PlaybookParams::default()
        }
    }
}

impl Playbook for TransitionBreakout {
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
        let (high, low) = channel(ctx.history, self.box_lookback)?;
        let width = high - low;
        let limit = self.max_box_atr * atr;
        if width < EPSILON || width > limit {
            return None;
        }
        let close = ctx.bar.close;
        let (direction, distance) = if close > high {
            (Direction::Long, close - high)
        } else if close < low {
            (Direction::Short, low - close)
        } else {
            return None;
        };
        let compression = 1.0 - width / limit;
        Some(Setup {
            direction,
            strength: 0.5 * (distance / atr).clamp(0.0, 1.0) + 0.5 * compression.clamp(0.0, 1.0),
            reference_price: close,
            stop: Some((high + low) / 2.0),
        })
    }
}
