//! Range reversion: fade the edges of a rotating range.
//!
//! Requires low |commitment| and high path entropy. Long when the close sits
//! in the bottom `band` of the prior range on an up-closing bar, short at the
//! top on a down-closing bar. Stop goes beyond the range extreme.

use crate::domain::{Direction, PlaybookId, RegimeLabel};
use crate::numeric::EPSILON;
use crate::playbook::params::{PlaybookParams, SalvageParams, StopParams, TargetSpec};
use crate::playbook::{EntryContext, Playbook, Setup};

use super::channel;

pub const NAME: &str = "range_reversion";

#[derive(Debug, Clone)]
pub struct RangeReversion {
    id: PlaybookId,
    params: PlaybookParams,
    lookback: usize,
    max_commitment: f64,
    min_entropy: f64,
    band: f64,
    stop_buffer_atr: f64,
}

impl RangeReversion {
    pub fn new(id: PlaybookId, params: PlaybookParams) -> Self {
        Self {
            id,
            lookback: params.setup_param_usize("lookback", 20),
            max_commitment: params.setup_param("max_commitment", 0.3),
            min_entropy: params.setup_param("min_entropy", 0.6),
            band: params.setup_param("band", 0.2),
            stop_buffer_atr: params.setup_param("stop_buffer_atr", 0.5),
            params,
        }
    }

    pub fn default_params() -> PlaybookParams {
        PlaybookParams {
            preferred_regimes: vec![RegimeLabel::Range],
            max_bars_held: Some(60),
            stops: StopParams {
                t1: 0.4,
                t2: 0.9,
                trail_distance_r: 0.6,
                ..StopParams::default()
            },
            salvage: SalvageParams {
                min_mfe_r: 0.4,
                ..SalvageParams::default()
            },
            targets: vec![TargetSpec::new(0.8, 0.5), TargetSpec::new(1.5, 0.5)],
            ..PlaybookParams::default()
        }
    }
}

impl Playbook for RangeReversion {
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
        let commitment = ctx.features.directional_commitment?;
        let entropy = ctx.features.path_entropy?;
        if commitment.abs() > self.max_commitment || entropy < self.min_entropy {
            return None;
        }
        let (high, low) = channel(ctx.history, self.lookback)?;
        let width = high - low;
        let band = self.band * width;
        if width < EPSILON || band < EPSILON {
            return None;
        }

        let bar = ctx.bar;
        let (direction, proximity, stop) = if bar.close <= low + band && bar.close > bar.open {
            (
                Direction::Long,
                1.0 - (bar.close - low) / band,
                low - self.stop_buffer_atr * atr,
            )
        } else if bar.close >= high - band && bar.close < bar.open {
            (
                Direction::Short,
                1.0 - (high - bar.close) / band,
                high + self.stop_buffer_atr * atr,
            )
        } else {
            return None;
        };

        Some(Setup {
            direction,
            strength: 0.5 * proximity.clamp(0.0, 1.0) + 0.5 * entropy.clamp(0.0, 1.0),
            reference_price: bar.close,
            stop: Some(stop),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::features::make_bars;
    use crate::playbook::test_support::{features, regime};
    use crate::playbook::PlaybookStats;

    fn ranging() -> Vec<Bar> {
        let closes: Vec<f64> = (0..25)
            .map(|i| if i % 2 == 0 { 100.0 } else { 104.0 })
            .collect();
        make_bars(&closes)
    }

    fn detect(bars: &[Bar]) -> Option<Setup> {
        let pb = RangeReversion::new(PlaybookId(2), RangeReversion::default_params());
        let (bar, history) = bars.split_last().unwrap();
        let mut feats = features(bar.timestamp, 1.0);
        feats.directional_commitment = Some(0.0);
        feats.path_entropy = Some(0.9);
        let regime = regime(RegimeLabel::Range, 0.7);
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
    fn bounce_off_range_low_goes_long() {
        let mut bars = ranging();
        let last = bars.len() - 1;
        bars[last].open = 99.2;
        bars[last].low = 99.1;
        bars[last].close = 99.6;
        bars[last].high = 99.8;
        // channel of history: high 105, low 99 (width 6, band 1.2)
        let setup = detect(&bars).unwrap();
        assert_eq!(setup.direction, Direction::Long);
        assert_eq!(setup.stop, Some(98.5));
    }

    #[test]
    fn rejection_at_range_high_goes_short() {
        let mut bars = ranging();
        let last = bars.len() - 1;
        bars[last].open = 104.8;
        bars[last].high = 104.9;
        bars[last].close = 104.3;
        bars[last].low = 104.2;
        let setup = detect(&bars).unwrap();
        assert_eq!(setup.direction, Direction::Short);
        assert_eq!(setup.stop, Some(105.5));
    }

    #[test]
    fn middle_of_range_is_ignored() {
        let mut bars = ranging();
        let last = bars.len() - 1;
        bars[last].open = 101.5;
        bars[last].close = 102.0;
        bars[last].high = 102.2;
        bars[last].low = 101.4;
        assert!(detect(&bars).is_none());
    }
}
