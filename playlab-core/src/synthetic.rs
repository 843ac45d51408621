//! Deterministic synthetic market data.
//!
//! A seeded regime-switching minute-bar generator, a matching order-book
//! snapshot generator, labelled classifier inputs, and a hand-specified
//! reference regime model. Used by tests, benches and the runner's fitting
//! tests; never by the decision path itself.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, BookLevel, OrderBookSnapshot, RegimeLabel};
use crate::features::FEATURE_DIM;
use crate::regime::{MixtureComponent, RegimeModel};

/// 2024-01-02 09:30, the first bar of every generated series.
pub fn session_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

/// Standard normal draw (Box–Muller).
pub fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ─── Bars ────────────────────────────────────────────────────────────

/// Regime-switching minute-bar generator.
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    rng: StdRng,
    price: f64,
    timestamp: NaiveDateTime,
    base_volume: f64,
}

impl SyntheticMarket {
    pub fn new(seed: u64, start_price: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            price: start_price,
            timestamp: session_start(),
            base_volume: 1_000.0,
        }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// `n` bars whose dynamics follow `label`.
    pub fn segment(&mut self, label: RegimeLabel, n: usize) -> Vec<Bar> {
        let drift_sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let anchor = self.price;
        let mut bars = Vec::with_capacity(n);
        for _ in 0..n {
            let noise = standard_normal(&mut self.rng);
            let (ret, sigma, volume_mult) = match label {
                RegimeLabel::Trend => (drift_sign * 0.0006 + 0.0004 * noise, 0.0004, 1.2),
                RegimeLabel::Range => {
                    let pull = -0.2 * (self.price - anchor) / anchor;
                    (pull + 0.0004 * noise, 0.0004, 0.9)
                }
                RegimeLabel::Volatile => (0.0025 * noise, 0.0025, 2.5),
                RegimeLabel::Transitional => (0.00015 * noise, 0.00015, 0.7),
            };
            bars.push(self.next_bar(ret, sigma, volume_mult));
        }
        bars
    }

    /// Cycle through `labels`, `bars_per_segment` bars each. Returns the bars
    /// and the generating label of every bar.
    pub fn session(&mut self, labels: &[RegimeLabel], bars_per_segment: usize) -> (Vec<Bar>, Vec<RegimeLabel>) {
        let mut bars = Vec::with_capacity(labels.len() * bars_per_segment);
        let mut truth = Vec::with_capacity(labels.len() * bars_per_segment);
        for label in labels {
            bars.extend(self.segment(*label, bars_per_segment));
            truth.extend(std::iter::repeat(*label).take(bars_per_segment));
        }
        (bars, truth)
    }

    fn next_bar(&mut self, ret: f64, sigma: f64, volume_mult: f64) -> Bar {
        let open = self.price;
        let close = (open * (1.0 + ret)).max(0.01);
        let wick_up = standard_normal(&mut self.rng).abs() * sigma * open * 0.5;
        let wick_down = standard_normal(&mut self.rng).abs() * sigma * open * 0.5;
        let volume_noise = 1.0 + 0.3 * standard_normal(&mut self.rng);
        let volume = (self.base_volume * volume_mult * volume_noise).max(10.0).round();
        let bar = Bar {
            timestamp: self.timestamp,
            open,
            high: open.max(close) + wick_up,
            low: (open.min(close) - wick_down).max(0.005),
            close,
            volume,
        };
        self.price = close;
        self.timestamp += Duration::minutes(1);
        bar
    }
}

/// The standard test tape: every regime twice, 60 bars per segment.
pub fn regime_switching_bars(seed: u64) -> Vec<Bar> {
    use RegimeLabel::*;
    let labels = [Range, Trend, Volatile, Transitional, Trend, Range, Volatile, Trend];
    SyntheticMarket::new(seed, 100.0).session(&labels, 60).0
}

// ─── Snapshots ───────────────────────────────────────────────────────

/// One snapshot per bar at the bar's timestamp, `levels` deep per side.
///
/// Resting size leans toward the bar's direction, and roughly one side in
/// twenty carries a level above `large_size`.
pub fn snapshots_for(bars: &[Bar], seed: u64, levels: usize, large_size: f64) -> Vec<OrderBookSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    bars.iter()
        .map(|bar| {
            let tick = (bar.close * 0.0001).max(0.01);
            let lean = if bar.close >= bar.open { 1.3 } else { 0.7 };
            let mut side = |sign: f64, tilt: f64| -> Vec<BookLevel> {
                let wall_at = if rng.gen_bool(0.05) {
                    Some(rng.gen_range(0..levels.max(1)))
                } else {
                    None
                };
                (0..levels)
                    .map(|i| {
                        let price = bar.close + sign * tick * (i as f64 + 0.5);
                        let mut size = (rng.gen_range(50.0..300.0) * tilt).round();
                        if wall_at == Some(i) {
                            size = large_size * rng.gen_range(1.2..2.0);
                        }
                        BookLevel::new(price, size, rng.gen_range(1..20))
                    })
                    .collect()
            };
            let bids = side(-1.0, lean);
            let asks = side(1.0, 2.0 - lean);
            OrderBookSnapshot::new(bar.timestamp, bids, asks)
        })
        .collect()
}

// ─── Reference model ─────────────────────────────────────────────────

/// Hand-specified model over the five classifier inputs.
///
/// Identity projection; diagonal covariances in standardized space.
/// Two trend clusters (up and down) share the TREND label.
pub fn reference_regime_model() -> RegimeModel {
    let component = |weight: f64, mean: [f64; FEATURE_DIM], var: [f64; FEATURE_DIM]| MixtureComponent {
        weight,
        mean: mean.to_vec(),
        covariance: diagonal(&var),
    };
    RegimeModel {
        feature_mean: vec![1.0, 0.8, 0.0, 0.0, 0.5],
        feature_scale: vec![0.4, 0.15, 1.0, 0.4, 0.15],
        projection_mean: vec![0.0; FEATURE_DIM],
        projection: diagonal(&[1.0; FEATURE_DIM]),
        components: vec![
            component(0.2, [0.0, -1.33, 0.3, 1.75, 0.0], [1.0, 0.6, 1.0, 0.5, 1.0]),
            component(0.2, [0.0, -1.33, 0.3, -1.75, 0.0], [1.0, 0.6, 1.0, 0.5, 1.0]),
            component(0.3, [-0.25, 1.0, -0.3, 0.0, 0.33], [0.6, 0.4, 0.8, 0.3, 1.0]),
            component(0.15, [3.0, 0.0, 2.0, 0.0, -1.0], [1.5, 1.0, 1.5, 1.0, 1.0]),
            component(0.15, [0.0; FEATURE_DIM], [1.5; FEATURE_DIM]),
        ],
        cluster_labels: vec![
            RegimeLabel::Trend,
            RegimeLabel::Trend,
            RegimeLabel::Range,
            RegimeLabel::Volatile,
            RegimeLabel::Transitional,
        ],
    }
}

/// Feature vectors drawn from the reference model's components, tagged with
/// the component's label. `per_component` draws from each component.
pub fn labelled_feature_vectors(seed: u64, per_component: usize) -> Vec<([f64; FEATURE_DIM], RegimeLabel)> {
    let model = reference_regime_model();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(per_component * model.components.len());
    for (component, label) in model.components.iter().zip(model.cluster_labels.iter()) {
        for _ in 0..per_component {
            let mut x = [0.0; FEATURE_DIM];
            for (j, value) in x.iter_mut().enumerate() {
                let z = component.mean[j] + component.covariance[j][j].sqrt() * standard_normal(&mut rng);
                *value = model.feature_mean[j] + model.feature_scale[j] * z;
            }
            out.push((x, *label));
        }
    }
    out
}

fn diagonal(values: &[f64]) -> Vec<Vec<f64>> {
    (0..values.len())
        .map(|i| {
            let mut row = vec![0.0; values.len()];
            row[i] = values[i];
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_tape() {
        assert_eq!(regime_switching_bars(11), regime_switching_bars(11));
        assert_ne!(regime_switching_bars(11), regime_switching_bars(12));
    }

    #[test]
    fn bars_are_sane_and_ordered() {
        let bars = regime_switching_bars(3);
        assert_eq!(bars.len(), 480);
        assert!(bars.iter().all(Bar::is_sane));
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn snapshots_align_with_bars() {
        let bars = regime_switching_bars(5);
        let snaps = snapshots_for(&bars, 9, 5, 500.0);
        assert_eq!(snaps.len(), bars.len());
        assert!(snaps.iter().all(|s| s.bids.len() == 5 && s.asks.len() == 5));
        assert!(snaps.iter().zip(&bars).all(|(s, b)| s.timestamp == b.timestamp));
        assert!(snaps.iter().all(|s| s.malformed_levels() == 0));
    }

    #[test]
    fn labelled_vectors_cover_every_component() {
        let v = labelled_feature_vectors(1, 10);
        assert_eq!(v.len(), 50);
        assert_eq!(v.iter().filter(|(_, l)| *l == RegimeLabel::Trend).count(), 20);
    }
}
