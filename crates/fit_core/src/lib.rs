//! FitCheck core: garment fit rules and deterministic inference
//!
//! Predicts whether a garment size will be small, fit or large for a body,
//! by evaluating a boosted tree ensemble trained to reproduce a sizing rule.
//!
//! Modules:
//! - `sizing`: standard size curve, tolerance table, versioned rule table
//! - `rules`: the ground-truth fit rule and secondary-measurement sampling
//! - `features`: feature schema and the standardizing/one-hot encoder
//! - `gbdt`: fixed-point multi-class tree ensemble evaluation
//! - `artifact`: encoder + ensemble persisted as one hashed unit
//! - `request`: lenient request decoding and input resolution
//! - `inference`: stateless prediction and the hot-swappable artifact slot

pub mod artifact;
pub mod errors;
pub mod features;
pub mod gbdt;
pub mod inference;
pub mod request;
pub mod rules;
pub mod serde_canon;
pub mod sizing;
pub mod types;

pub use artifact::{ModelArtifact, TrainingSummary, HASH_FILE_NAME, MODEL_FILE_NAME};
pub use errors::{FitCoreError, Result};
pub use features::{FeatureEncoder, FeatureVector, FEATURE_SCHEMA, UNKNOWN_BUCKET};
pub use gbdt::{Ensemble, Node, Tree, SCALE};
pub use inference::{ArtifactSlot, ClassProbabilities, InferenceService, Prediction};
pub use request::{FitRequest, HIP_OVERRIDE_RATIO};
pub use rules::RuleEngine;
pub use sizing::{CategoryRule, HipRatio, RuleTable, SizeGrid, StandardSizeCurve, ToleranceTable};
pub use types::{Category, FitLabel, Measurement};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
