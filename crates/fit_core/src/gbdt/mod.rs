//! Deterministic GBDT ensemble evaluation
//!
//! - Thresholds, leaf values and base scores are fixed-point integers at [`SCALE`]
//! - Tree traversal uses integer `<=` comparison
//! - Same feature vector always produces the same raw scores
//!
//! Trees are grown by the offline trainer; this module only evaluates them.

pub mod model;
pub mod tree;

pub use model::{softmax, Ensemble, ENSEMBLE_VERSION, SCALE};
pub use tree::{Node, Tree};
