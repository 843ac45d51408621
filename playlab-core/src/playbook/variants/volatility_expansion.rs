//! Volatility expansion: ride a wide-body bar when volatility and
//! participation surge together.
//!
//! Direction follows the bar body; the stop sits at the bar's opposite
//! extreme.

use crate::domain::{Direction, PlaybookId, RegimeLabel};
use crate::numeric::EPSILON;
use crate::playbook::params::{OrderFlowExitParams, PlaybookParams, StopParams, TargetSpec};
use crate::playbook::{EntryContext, Playbook, Setup};

pub const NAME: &str = "volatility_expansion";

#[derive(Debug, Clone)]
pub struct VolatilityExpansion {
    id: PlaybookId,
    params: PlaybookParams,
    min_vol_ratio: f64,
    min_participation: f64,
    min_body_fraction: f64,
}

impl VolatilityExpansion {
    pub fn new(id: PlaybookId, params: PlaybookParams) -> Self {
        Self {
            id,
            min_vol_ratio: params.setup_param("min_vol_ratio", 1.5),
            min_participation: params.setup_param("min_participation", 1.0),
            min_body_fraction: params.setup_param("min_body_fraction", 0.5),
            params,
        }
    }

    pub fn default_params() -> PlaybookParams {
        PlaybookParams {
            preferred_regimes: vec![RegimeLabel::Volatile],
            max_bars_held: Some(30),
            stops: StopParams {
                t1: 0.6,
                t2: 1.5,
                trail_distance_r: 1.2,
                ..StopParams::default()
            },
            order_flow_exit: OrderFlowExitParams {
                reversal_threshold: 0.5,
                ..OrderFlowExitParams::default()
            },
            targets: vec![TargetSpec::new(1.5, 0.5), TargetSpec::new(3.0, 0.5)],
            ..PlaybookParams::default()
        }
    }
}

impl Playbook for VolatilityExpansion {
    fn id(&self) -> PlaybookId {
        self.id
    }

    fn name(&self) -> &str {
        NAME
    }

    fn params(&self) -> &PlaybookParams {
        &self.params
    }

    fn detect_setup(&self, ctx: &EntryContext<'_>, _atr: f64) -> Option<Setup> {
        let ratio = ctx.features.volatility_ratio?;
        let participation = ctx.features.participation?;
        if ratio < self.min_vol_ratio || participation < self.min_participation {
            return None;
        }
        let bar = ctx.bar;
        let range = bar.range();
        if range < EPSILON {
            return None;
        }
        let body = bar.close - bar.open;
        if body.abs() / range < self.min_body_fraction {
            return None;
        }
        let direction = Direction::from_sign(body)?;
        let stop = match direction {
            Direction::Long => bar.low,
            Direction::Short => bar.high,
        };
        let strength = 0.5 * ((ratio - 1.0) / 2.0).clamp(0.0, 1.0)
            + 0.5 * (participation / 3.0).clamp(0.0, 1.0);
        Some(Setup {
            direction,
            strength,
            reference_price: bar.close,
            stop: Some(stop),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_bars;
    use crate::playbook::test_support::{features, regime};
    use crate::playbook::PlaybookStats;

    fn detect(ratio: f64, participation: f64, open: f64, close: f64) -> Option<Setup> {
        let pb = VolatilityExpansion::new(PlaybookId(3), VolatilityExpansion::default_params());
        let mut bars = make_bars(&[100.0, 100.0]);
        bars[1].open = open;
        bars[1].close = close;
        bars[1].high = open.max(close) + 0.2;
        bars[1].low = open.min(close) - 0.2;
        let (bar, history) = bars.split_last().unwrap();
        let mut feats = features(bar.timestamp, 1.0);
        feats.volatility_ratio = Some(ratio);
        feats.participation = Some(participation);
        let regime = regime(RegimeLabel::Volatile, 0.7);
        let stats = PlaybookStats::default();
        let ctx = EntryContext {
            history,
            bar,
            regime: &regime,
            features: &feats,
            open_positions: &[],
            micro: None,
            stats: &stats,
        };
        pb.detect_setup(&ctx, 1.0)
    }

    #[test]
    fn surge_with_up_body_goes_long() {
        let setup = detect(2.5, 3.0, 100.0, 102.0).unwrap();
        assert_eq!(setup.direction, Direction::Long);
        assert_eq!(setup.stop, Some(99.8));
        assert!((setup.strength - (0.5 * 0.75 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn surge_with_down_body_goes_short() {
        let setup = detect(2.0, 1.5, 102.0, 100.0).unwrap();
        assert_eq!(setup.direction, Direction::Short);
        assert_eq!(setup.stop, Some(102.2));
    }

    #[test]
    fn quiet_market_is_ignored() {
        assert!(detect(1.1, 3.0, 100.0, 102.0).is_none());
        assert!(detect(2.5, 0.2, 100.0, 102.0).is_none());
    }

    #[test]
    fn doji_is_ignored() {
        assert!(detect(2.5, 3.0, 100.0, 100.05).is_none());
    }
}
