//! Participation intensity: z-score of the current bar's volume against the
//! preceding window.

use crate::domain::Bar;
use crate::numeric::{mean, std_dev, EPSILON};

/// Z-score of the last bar's volume against the `n` bars before it.
/// 0 when the reference volumes have no variance.
pub fn volume_zscore(window: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }
    let (current, rest) = window.split_last()?;
    let reference: Vec<f64> = rest[rest.len() - n..].iter().map(|b| b.volume).collect();
    let mu = mean(&reference)?;
    let sigma = std_dev(&reference)?;
    if sigma < EPSILON || !current.volume.is_finite() {
        return Some(0.0);
    }
    Some((current.volume - mu) / sigma)
}

/// Current volume relative to the mean of the `n` bars before it.
/// 1.0 when the reference mean is zero.
pub fn relative_volume(window: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }
    let (current, rest) = window.split_last()?;
    let reference: Vec<f64> = rest[rest.len() - n..].iter().map(|b| b.volume).collect();
    let mu = mean(&reference)?;
    if mu < EPSILON || !current.volume.is_finite() {
        return Some(1.0);
    }
    Some(current.volume / mu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::make_bars;

    #[test]
    fn constant_volume_is_neutral() {
        let bars = make_bars(&[100.0; 25]);
        assert_eq!(volume_zscore(&bars, 20), Some(0.0));
        assert_eq!(relative_volume(&bars, 20), Some(1.0));
    }

    #[test]
    fn surge_is_positive() {
        let mut bars = make_bars(&[100.0; 25]);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.volume = if i % 2 == 0 { 900.0 } else { 1100.0 };
        }
        bars[24].volume = 3000.0;
        let z = volume_zscore(&bars, 20).unwrap();
        assert!(z > 10.0, "z = {z}");
        let rel = relative_volume(&bars, 20).unwrap();
        assert!((rel - 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_volume_reference() {
        let mut bars = make_bars(&[100.0; 25]);
        for bar in bars.iter_mut() {
            bar.volume = 0.0;
        }
        assert_eq!(relative_volume(&bars, 20), Some(1.0));
        assert_eq!(volume_zscore(&bars, 20), Some(0.0));
    }
}
