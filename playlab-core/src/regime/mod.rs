//! Regime Classifier: frozen unsupervised model scored once per bar.
//!
//! Fitting happens out-of-band (see the runner crate). At runtime the
//! classifier maps one `FeatureSnapshot` to a `RegimeAssignment`.

pub mod classifier;
pub mod model;

pub use classifier::RegimeClassifier;
pub use model::{MixtureComponent, RegimeModel};
