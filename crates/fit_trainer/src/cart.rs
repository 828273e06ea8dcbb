//! Weighted CART builder for one boosting step
//!
//! Split search is histogram based: every feature value is quantized once
//! into bins of width `quant_step`, and each node accumulates per-bin
//! gradient/hessian sums before a single prefix sweep. Thresholds sit on
//! bin edges, so `value <= threshold` selects exactly the bins to the left.

use fitcheck_core::gbdt::{Node, Tree, SCALE};
use std::collections::BTreeSet;

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 regularisation on leaf weights
    pub lambda: f64,
    pub learning_rate: f64,
    /// Bin width in fixed-point feature units
    pub quant_step: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_leaf: 4,
            lambda: 1.0,
            learning_rate: 0.2,
            quant_step: SCALE / 100,
        }
    }
}

/// Minimum gain for a split to be kept
const MIN_SPLIT_GAIN: f64 = 1e-9;

/// Feature matrix quantized into per-feature bin indices
///
/// Built once per training run and shared by every tree.
#[derive(Clone, Debug)]
pub struct BinnedFeatures {
    /// `bins[row][feature]` is an index into `edges[feature]`
    bins: Vec<Vec<u32>>,
    /// Sorted upper threshold of each occupied bin, per feature
    edges: Vec<Vec<i64>>,
    feature_count: usize,
}

impl BinnedFeatures {
    pub fn new(features: &[Vec<i64>], feature_count: usize, quant_step: i64) -> Self {
        let step = quant_step.max(1);

        let mut occupied = vec![BTreeSet::new(); feature_count];
        for row in features {
            for (f, &value) in row.iter().enumerate().take(feature_count) {
                occupied[f].insert(value.div_euclid(step));
            }
        }
        let bin_ids: Vec<Vec<i64>> = occupied
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();

        let bins = features
            .iter()
            .map(|row| {
                (0..feature_count)
                    .map(|f| {
                        let bin = row.get(f).copied().unwrap_or(0).div_euclid(step);
                        bin_ids[f].binary_search(&bin).unwrap_or(0) as u32
                    })
                    .collect()
            })
            .collect();

        // all values in bin b satisfy value <= (b + 1) * step - 1
        let edges = bin_ids
            .iter()
            .map(|ids| {
                ids.iter()
                    .map(|&b| b.saturating_add(1).saturating_mul(step).saturating_sub(1))
                    .collect()
            })
            .collect();

        Self {
            bins,
            edges,
            feature_count,
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn bin_count(&self, feature_idx: usize) -> usize {
        self.edges.get(feature_idx).map_or(0, Vec::len)
    }
}

#[derive(Clone, Copy, Default)]
struct BinStats {
    gradient: f64,
    hessian: f64,
    count: usize,
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    bin: u32,
    threshold: i64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain
            || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// Build a regression tree on weighted gradients and hessians
pub struct CartBuilder<'a> {
    config: &'a TreeConfig,
    data: &'a BinnedFeatures,
    gradients: &'a [f64],
    hessians: &'a [f64],
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        data: &'a BinnedFeatures,
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: &'a TreeConfig,
    ) -> Self {
        Self {
            config,
            data,
            gradients,
            hessians,
        }
    }

    /// Build the tree; nodes are laid out in pre-order with node 0 as root
    pub fn build(&self) -> Tree {
        let n = self
            .data
            .len()
            .min(self.gradients.len())
            .min(self.hessians.len());
        let indices: Vec<usize> = (0..n).collect();

        let mut nodes = Vec::new();
        self.build_node(&indices, 0, &mut nodes);
        Tree::new(nodes)
    }

    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current = nodes.len() as i32;

        let split = if depth < self.config.max_depth
            && indices.len() >= 2 * self.config.min_samples_leaf.max(1)
        {
            self.find_best_split(indices)
        } else {
            None
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current, self.leaf_value(indices)));
            return current;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.data.bins[i][split.feature_idx] <= split.bin);

        // placeholder children, patched once the subtrees exist
        nodes.push(Node::internal(
            current,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));
        let left_idx = self.build_node(&left, depth + 1, nodes);
        let right_idx = self.build_node(&right, depth + 1, nodes);

        let node = &mut nodes[current as usize];
        node.left = left_idx;
        node.right = right_idx;
        current
    }

    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let lambda = self.config.lambda;
        let min_leaf = self.config.min_samples_leaf.max(1);

        let (total_g, total_h) = self.sums(indices);
        let total_n = indices.len();
        let parent_score = total_g * total_g / (total_h + lambda);

        let mut best: Option<SplitCandidate> = None;

        for feature_idx in 0..self.data.feature_count() {
            let bin_count = self.data.bin_count(feature_idx);
            if bin_count < 2 {
                continue;
            }

            let mut histogram = vec![BinStats::default(); bin_count];
            for &i in indices {
                let stats = &mut histogram[self.data.bins[i][feature_idx] as usize];
                stats.gradient += self.gradients[i];
                stats.hessian += self.hessians[i];
                stats.count += 1;
            }

            let mut left = BinStats::default();
            // the last bin can never be a left side
            for (bin, stats) in histogram.iter().enumerate().take(bin_count - 1) {
                if stats.count == 0 {
                    continue;
                }
                left.gradient += stats.gradient;
                left.hessian += stats.hessian;
                left.count += stats.count;

                let right_n = total_n - left.count;
                if left.count < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_g = total_g - left.gradient;
                let right_h = total_h - left.hessian;
                let gain = left.gradient * left.gradient / (left.hessian + lambda)
                    + right_g * right_g / (right_h + lambda)
                    - parent_score;
                if gain.is_nan() || gain <= MIN_SPLIT_GAIN {
                    continue;
                }

                let threshold = self.data.edges[feature_idx][bin];
                let candidate = SplitCandidate {
                    feature_idx,
                    bin: bin as u32,
                    threshold,
                    gain,
                    tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
                };
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &i| {
            (g + self.gradients[i], h + self.hessians[i])
        })
    }

    /// Newton step `-G / (H + lambda)`, shrunk by the learning rate, in fixed point
    fn leaf_value(&self, indices: &[usize]) -> i64 {
        let (g, h) = self.sums(indices);
        let weight = -g / (h + self.config.lambda) * self.config.learning_rate;
        if weight.is_finite() {
            (weight * SCALE as f64).round() as i64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<i64>>, Vec<f64>, Vec<f64>) {
        // feature 0 separates the gradients, feature 1 is noise-free constant
        let features: Vec<Vec<i64>> = (0..20)
            .map(|i| vec![i * SCALE / 10, SCALE])
            .collect();
        let gradients = (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect();
        let hessians = vec![1.0; 20];
        (features, gradients, hessians)
    }

    #[test]
    fn test_binning_thresholds_cover_bins() {
        let features = vec![vec![0], vec![149_999], vec![150_000], vec![-1]];
        let binned = BinnedFeatures::new(&features, 1, 100_000);
        assert_eq!(binned.bin_count(0), 3);
        assert_eq!(binned.edges[0], vec![-1, 99_999, 199_999]);
        for (row, values) in features.iter().enumerate() {
            let bin = binned.bins[row][0] as usize;
            assert!(values[0] <= binned.edges[0][bin]);
            if bin > 0 {
                assert!(values[0] > binned.edges[0][bin - 1]);
            }
        }
    }

    #[test]
    fn test_single_split_on_step() {
        let (features, gradients, hessians) = step_data();
        let binned = BinnedFeatures::new(&features, 2, 10_000);
        let config = TreeConfig {
            max_depth: 1,
            min_samples_leaf: 1,
            lambda: 0.0,
            learning_rate: 1.0,
            quant_step: 10_000,
        };
        let tree = CartBuilder::new(&binned, &gradients, &hessians, &config).build();

        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert!(tree.validate(2).is_ok());
        // rows with negative gradient get a positive step
        assert_eq!(tree.evaluate(&[0, SCALE]), SCALE);
        assert_eq!(tree.evaluate(&[19 * SCALE / 10, SCALE]), -SCALE);
        assert_eq!(tree.evaluate(&[9 * SCALE / 10, 0]), SCALE);
        assert_eq!(tree.evaluate(&[SCALE, 0]), -SCALE);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (features, gradients, hessians) = step_data();
        let binned = BinnedFeatures::new(&features, 2, 10_000);
        let config = TreeConfig {
            max_depth: 4,
            min_samples_leaf: 11,
            ..TreeConfig::default()
        };
        let tree = CartBuilder::new(&binned, &gradients, &hessians, &config).build();
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.nodes[0].is_leaf());
    }

    #[test]
    fn test_pure_node_becomes_leaf() {
        let features: Vec<Vec<i64>> = (0..10).map(|i| vec![i * SCALE]).collect();
        let gradients = vec![0.5; 10];
        let hessians = vec![0.25; 10];
        let binned = BinnedFeatures::new(&features, 1, SCALE);
        let config = TreeConfig::default();
        let tree = CartBuilder::new(&binned, &gradients, &hessians, &config).build();

        assert_eq!(tree.leaf_count(), 1);
        // -5 / (2.5 + 1) * 0.2
        let expected = (-5.0 / 3.5 * 0.2 * SCALE as f64).round() as i64;
        assert_eq!(tree.evaluate(&[0]), expected);
    }

    #[test]
    fn test_build_is_deterministic() {
        let (features, gradients, hessians) = step_data();
        let binned = BinnedFeatures::new(&features, 2, 10_000);
        let config = TreeConfig {
            min_samples_leaf: 2,
            ..TreeConfig::default()
        };
        let a = CartBuilder::new(&binned, &gradients, &hessians, &config).build();
        let b = CartBuilder::new(&binned, &gradients, &hessians, &config).build();
        assert_eq!(a, b);
        assert!(a.depth() <= config.max_depth);
    }
}
