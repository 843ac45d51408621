//! Standardization and principal-component projection.
//!
//! Components come from the symmetric eigendecomposition of the standardized
//! covariance, sorted by descending eigenvalue. Each axis is sign-normalized
//! so its largest-magnitude loading is positive.

use nalgebra::{DMatrix, SymmetricEigen};
use playlab_core::numeric::{mean, std_dev, EPSILON};
use tracing::warn;

use super::FitError;

/// Per-feature mean and scale. Constant features get scale 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Standardizer {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, FitError> {
        let dim = rows.first().map(|r| r.len()).ok_or(FitError::InsufficientData { have: 0, need: 1 })?;
        let mut mu = Vec::with_capacity(dim);
        let mut scale = Vec::with_capacity(dim);
        for j in 0..dim {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let m = mean(&column).unwrap_or(0.0);
            let s = std_dev(&column).unwrap_or(0.0);
            if s < EPSILON {
                warn!(feature = j, "constant feature, scale fixed at 1");
            }
            mu.push(m);
            scale.push(if s < EPSILON { 1.0 } else { s });
        }
        Ok(Self { mean: mu, scale })
    }

    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Retained principal axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    /// Mean of the standardized inputs.
    pub mean: Vec<f64>,
    /// k×d loadings, one row per retained axis.
    pub loadings: Vec<Vec<f64>>,
    /// Share of total variance per retained axis.
    pub explained: Vec<f64>,
}

impl Pca {
    /// Keep the fewest leading axes whose cumulative variance share reaches
    /// `variance_retained`.
    pub fn fit(rows: &[Vec<f64>], variance_retained: f64) -> Result<Self, FitError> {
        let n = rows.len();
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        if n < 2 || d == 0 {
            return Err(FitError::InsufficientData { have: n, need: 2 });
        }
        let mu: Vec<f64> = (0..d)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
            .collect();
        let centered = DMatrix::from_fn(n, d, |i, j| rows[i][j] - mu[j]);
        let cov = (centered.transpose() * &centered) / (n as f64 - 1.0);

        let eigen = SymmetricEigen::new(cov);
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let values: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
        let total: f64 = values.iter().sum();
        if !total.is_finite() || total < EPSILON {
            return Err(FitError::Degenerate("standardized corpus has no variance".into()));
        }

        let mut loadings = Vec::new();
        let mut explained = Vec::new();
        let mut cumulative = 0.0;
        for (&idx, &value) in order.iter().zip(values.iter()) {
            let mut axis: Vec<f64> = eigen.eigenvectors.column(idx).iter().copied().collect();
            let pivot = axis.iter().copied().fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                axis.iter_mut().for_each(|v| *v = -*v);
            }
            loadings.push(axis);
            explained.push(value / total);
            cumulative += value / total;
            if cumulative + 1e-12 >= variance_retained {
                break;
            }
        }
        Ok(Self {
            mean: mu,
            loadings,
            explained,
        })
    }

    pub fn dims(&self) -> usize {
        self.loadings.len()
    }

    pub fn project(&self, z: &[f64]) -> Vec<f64> {
        self.loadings
            .iter()
            .map(|row| {
                row.iter()
                    .zip(z.iter().zip(self.mean.iter()))
                    .map(|(a, (v, m))| a * (v - m))
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_data() -> Vec<Vec<f64>> {
        // all variance along (1, 1, 0) plus a little noise on the third axis
        (0..50)
            .map(|i| {
                let t = i as f64 / 10.0;
                vec![t, t, if i % 2 == 0 { 0.01 } else { -0.01 }]
            })
            .collect()
    }

    #[test]
    fn single_dominant_axis_is_kept() {
        let pca = Pca::fit(&line_data(), 0.85).unwrap();
        assert_eq!(pca.dims(), 1);
        assert!(pca.explained[0] > 0.99);
        let axis = &pca.loadings[0];
        assert!((axis[0] - axis[1]).abs() < 1e-9);
        assert!(axis[0] > 0.0);
    }

    #[test]
    fn full_retention_keeps_every_axis() {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64, (i % 3) as f64])
            .collect();
        let pca = Pca::fit(&rows, 1.0).unwrap();
        assert_eq!(pca.dims(), 3);
        let total: f64 = pca.explained.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_feature_keeps_unit_scale() {
        let rows = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]];
        let s = Standardizer::fit(&rows).unwrap();
        assert_eq!(s.scale[1], 1.0);
        assert_eq!(s.apply(&[2.0, 5.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn flat_corpus_is_degenerate() {
        let rows = vec![vec![0.0, 0.0]; 10];
        assert!(matches!(Pca::fit(&rows, 0.85), Err(FitError::Degenerate(_))));
    }
}
