//! Multi-class boosted ensemble
//!
//! One additive tree sequence per class. Raw class scores are summed in
//! fixed point (`base_score + Σ leaf`), and only the final softmax moves
//! to floating point.

use super::tree::Tree;
use serde::{Deserialize, Serialize};

/// Default scale factor for fixed-point arithmetic (1e6)
pub const SCALE: i64 = 1_000_000;

/// Ensemble format version
pub const ENSEMBLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ensemble {
    pub version: u32,

    /// Fixed-point scale of thresholds, leaves and base scores
    pub scale: i64,

    /// Encoded feature width the trees were grown on
    pub feature_count: usize,

    /// Initial raw score per class
    pub base_scores: Vec<i64>,

    /// `class_trees[class][round]`
    pub class_trees: Vec<Vec<Tree>>,
}

impl Ensemble {
    pub fn new(feature_count: usize, base_scores: Vec<i64>, class_trees: Vec<Vec<Tree>>) -> Self {
        Self {
            version: ENSEMBLE_VERSION,
            scale: SCALE,
            feature_count,
            base_scores,
            class_trees,
        }
    }

    pub fn class_count(&self) -> usize {
        self.base_scores.len()
    }

    pub fn num_trees(&self) -> usize {
        self.class_trees.iter().map(Vec::len).sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.version != ENSEMBLE_VERSION {
            return Err(format!("Unsupported ensemble version: {}", self.version));
        }
        if self.scale <= 0 {
            return Err(format!("Invalid scale: {}", self.scale));
        }
        if self.base_scores.is_empty() {
            return Err("Ensemble has no classes".to_string());
        }
        if self.class_trees.len() != self.base_scores.len() {
            return Err(format!(
                "Ensemble has {} base scores but {} tree sequences",
                self.base_scores.len(),
                self.class_trees.len()
            ));
        }
        for (class, trees) in self.class_trees.iter().enumerate() {
            for (round, tree) in trees.iter().enumerate() {
                tree.validate(self.feature_count)
                    .map_err(|e| format!("Class {class} tree {round}: {e}"))?;
            }
        }
        Ok(())
    }

    /// Fixed-point raw score per class
    pub fn raw_scores(&self, features: &[i64]) -> Vec<i64> {
        self.base_scores
            .iter()
            .zip(&self.class_trees)
            .map(|(&base, trees)| {
                trees
                    .iter()
                    .fold(base, |acc, tree| acc.saturating_add(tree.evaluate(features)))
            })
            .collect()
    }

    /// Class probabilities via softmax over the raw scores
    pub fn probabilities(&self, features: &[i64]) -> Vec<f64> {
        softmax(&self.raw_scores(features), self.scale)
    }
}

/// Numerically stable softmax over fixed-point logits
pub fn softmax(raw: &[i64], scale: i64) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let logits: Vec<f64> = raw.iter().map(|&r| r as f64 / scale as f64).collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
