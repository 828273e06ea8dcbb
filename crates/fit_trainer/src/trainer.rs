//! Multi-class gradient boosted tree trainer
//!
//! Softmax boosting: every round grows one regression tree per class on
//! that class's weighted gradients. Raw scores are tracked in the same
//! fixed-point units the ensemble evaluates at inference, so the training
//! probabilities are exactly what the artifact will produce.

use fitcheck_core::gbdt::{softmax, Ensemble, Tree, SCALE};
use fitcheck_core::FitLabel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{BinnedFeatures, CartBuilder, TreeConfig};
use crate::dataset::EncodedDataset;
use crate::errors::TrainerError;

/// Hessian floor that keeps leaf steps bounded on confident rows
const MIN_HESSIAN: f64 = 1e-6;

/// Prior probability floor for classes absent from the corpus
const MIN_PRIOR: f64 = 1e-6;

/// Boosting hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub trees_per_class: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: f64,
    /// L2 regularisation on leaf weights
    pub lambda: f64,
    /// Split threshold granularity, in standard deviations of the encoded feature
    pub quant_step: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            trees_per_class: 60,
            max_depth: 8,
            min_samples_leaf: 4,
            learning_rate: 0.2,
            lambda: 1.0,
            quant_step: 0.01,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.trees_per_class == 0 {
            return Err(TrainerError::Config("trees_per_class must be positive".to_string()));
        }
        if self.max_depth == 0 {
            return Err(TrainerError::Config("max_depth must be positive".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainerError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(TrainerError::Config(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if !(self.quant_step.is_finite() && self.quant_step > 0.0) {
            return Err(TrainerError::Config(format!(
                "quant_step must be positive, got {}",
                self.quant_step
            )));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            lambda: self.lambda,
            learning_rate: self.learning_rate,
            quant_step: ((self.quant_step * SCALE as f64).round() as i64).max(1),
        }
    }
}

/// Softmax GBDT trainer
pub struct GbdtTrainer {
    params: TrainingParams,
}

impl GbdtTrainer {
    pub fn new(params: TrainingParams) -> Result<Self, TrainerError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train a three-class ensemble on the encoded dataset
    pub fn train(&self, dataset: &EncodedDataset) -> Result<Ensemble, TrainerError> {
        let n = dataset.len();
        if n == 0 {
            return Err(TrainerError::Dataset("cannot train on an empty dataset".to_string()));
        }
        if dataset.labels.len() != n || dataset.weights.len() != n {
            return Err(TrainerError::Dataset(format!(
                "{} rows but {} labels and {} weights",
                n,
                dataset.labels.len(),
                dataset.weights.len()
            )));
        }
        if let Some(&label) = dataset.labels.iter().find(|&&l| l >= FitLabel::COUNT) {
            return Err(TrainerError::Dataset(format!("label index {label} out of range")));
        }

        let tree_config = self.params.tree_config();
        let binned = BinnedFeatures::new(&dataset.features, dataset.feature_count, tree_config.quant_step);

        let base_scores = self.base_scores(dataset);
        info!(
            "Base scores: small={} fit={} large={}",
            base_scores[0], base_scores[1], base_scores[2]
        );

        let mut raw: Vec<[i64; FitLabel::COUNT]> = vec![
            [base_scores[0], base_scores[1], base_scores[2]];
            n
        ];
        let mut class_trees: Vec<Vec<Tree>> =
            vec![Vec::with_capacity(self.params.trees_per_class); FitLabel::COUNT];

        for round in 0..self.params.trees_per_class {
            let probs: Vec<Vec<f64>> = raw.iter().map(|scores| softmax(scores, SCALE)).collect();

            // class trees of a round are independent; collect keeps class order
            let round_trees: Vec<Tree> = (0..FitLabel::COUNT)
                .into_par_iter()
                .map(|class| {
                    let (gradients, hessians) = class_gradients(dataset, &probs, class);
                    CartBuilder::new(&binned, &gradients, &hessians, &tree_config).build()
                })
                .collect();

            for (class, tree) in round_trees.into_iter().enumerate() {
                for (row, scores) in dataset.features.iter().zip(raw.iter_mut()) {
                    scores[class] = scores[class].saturating_add(tree.evaluate(row));
                }
                class_trees[class].push(tree);
            }

            if round % 10 == 9 || round + 1 == self.params.trees_per_class {
                debug!(
                    "Round {}/{}: weighted log-loss {:.5}",
                    round + 1,
                    self.params.trees_per_class,
                    weighted_log_loss(dataset, &raw)
                );
            }
        }

        let ensemble = Ensemble::new(dataset.feature_count, base_scores, class_trees);
        ensemble.validate().map_err(TrainerError::Training)?;

        info!(
            "Trained {} trees ({} per class), final weighted log-loss {:.5}",
            ensemble.num_trees(),
            self.params.trees_per_class,
            weighted_log_loss(dataset, &raw)
        );
        Ok(ensemble)
    }

    /// Log of the weighted class priors, in fixed point
    fn base_scores(&self, dataset: &EncodedDataset) -> Vec<i64> {
        let mut totals = [0.0f64; FitLabel::COUNT];
        for (&label, &weight) in dataset.labels.iter().zip(&dataset.weights) {
            totals[label] += weight;
        }
        let sum: f64 = totals.iter().sum();

        totals
            .iter()
            .map(|&total| {
                let prior = if sum > 0.0 { total / sum } else { 1.0 / 3.0 };
                (prior.max(MIN_PRIOR).ln() * SCALE as f64).round() as i64
            })
            .collect()
    }
}

/// Weighted softmax gradients and hessians for one class
fn class_gradients(dataset: &EncodedDataset, probs: &[Vec<f64>], class: usize) -> (Vec<f64>, Vec<f64>) {
    let mut gradients = Vec::with_capacity(dataset.len());
    let mut hessians = Vec::with_capacity(dataset.len());

    for ((p, &label), &weight) in probs.iter().zip(&dataset.labels).zip(&dataset.weights) {
        let p = p.get(class).copied().unwrap_or(0.0);
        let target = if label == class { 1.0 } else { 0.0 };
        gradients.push(weight * (p - target));
        hessians.push(weight * (p * (1.0 - p)).max(MIN_HESSIAN));
    }

    (gradients, hessians)
}

fn weighted_log_loss(dataset: &EncodedDataset, raw: &[[i64; FitLabel::COUNT]]) -> f64 {
    let mut loss = 0.0;
    let mut total_weight = 0.0;
    for ((scores, &label), &weight) in raw.iter().zip(&dataset.labels).zip(&dataset.weights) {
        let probs = softmax(scores, SCALE);
        let p = probs.get(label).copied().unwrap_or(0.0).max(1e-15);
        loss -= weight * p.ln();
        total_weight += weight;
    }
    if total_weight > 0.0 {
        loss / total_weight
    } else {
        0.0
    }
}
