//! PlayLab Runner — offline tooling around `playlab-core`.
//!
//! This crate provides:
//! - Feature corpus extraction from historical bars
//! - Regime-model fitting (standardize, PCA, Gaussian mixtures with BIC selection)
//! - Majority-vote cluster labelling against tagged validation vectors
//! - Replay runs with BLAKE3 action-stream fingerprints

pub mod corpus;
pub mod fit;
pub mod replay;

pub use corpus::{extract, extract_labelled, FeatureCorpus};
pub use fit::{fit_regime_model, FitConfig, FitError, FitReport};
pub use replay::{first_divergence, fingerprint_actions, replay, ReplayReport};
