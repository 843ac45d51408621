//! Arbitration factors — the five criteria a candidate signal is scored on.

use serde::{Deserialize, Serialize};

/// One scoring criterion. The discriminant is the index into [`FactorVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    RegimeAlignment = 0,
    HourExpectancy = 1,
    StrengthPercentile = 2,
    CapitalEfficiency = 3,
    Correlation = 4,
}

impl Factor {
    pub const COUNT: usize = 5;

    pub const ALL: [Factor; Factor::COUNT] = [
        Factor::RegimeAlignment,
        Factor::HourExpectancy,
        Factor::StrengthPercentile,
        Factor::CapitalEfficiency,
        Factor::Correlation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Factor values (each in [0, 1]) or factor weights, indexed by [`Factor`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorVector(pub [f64; Factor::COUNT]);

impl FactorVector {
    pub fn get(&self, factor: Factor) -> f64 {
        self.0[factor.index()]
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        self.0[factor.index()] = value;
    }

    /// Weighted sum against another vector.
    pub fn dot(&self, weights: &FactorVector) -> f64 {
        self.0.iter().zip(weights.0.iter()).map(|(v, w)| v * w).sum()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_declaration_order() {
        for (i, f) in Factor::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn dot_product() {
        let values = FactorVector([1.0, 0.5, 0.0, 0.25, 1.0]);
        let weights = FactorVector([0.2; 5]);
        assert!((values.dot(&weights) - 0.55).abs() < 1e-12);
    }
}
