//! Feature encoding shared by training and inference
//!
//! Numeric columns are standardized with statistics frozen at fit time;
//! categorical columns are one-hot encoded with an explicit unknown bucket.
//! All outputs are fixed-point integers at [`SCALE`].
//!
//! Encoded layout:
//! 0..6   `bra_num, hips, waist, size, height_cm, bmi_proxy` (standardized)
//! 6..    `cup_size=<v>` per vocabulary entry, then `cup_size=<unknown>`
//! ..     `category=<v>` per vocabulary entry, then `category=<unknown>`

use crate::errors::{FitCoreError, Result};
use crate::gbdt::SCALE;
use crate::types::{normalize_token, Measurement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Named input fields, in schema order
pub const FEATURE_SCHEMA: [&str; 8] = [
    "cup_size",
    "bra_num",
    "hips",
    "waist",
    "category",
    "size",
    "height_cm",
    "bmi_proxy",
];

/// Numeric columns, in encoded order
pub const NUMERIC_FEATURES: [&str; 6] = ["bra_num", "hips", "waist", "size", "height_cm", "bmi_proxy"];

/// Bucket name for categorical values outside the training vocabulary
pub const UNKNOWN_BUCKET: &str = "<unknown>";

/// Feature vector (scaled integers)
pub type FeatureVector = Vec<i64>;

/// Frozen standardization statistics for one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Standardizer plus one-hot vocabularies, persisted inside the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub numeric: Vec<ColumnStats>,
    pub cup_vocabulary: Vec<String>,
    pub category_vocabulary: Vec<String>,
}

/// Categorical buckets recovered from an encoded vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBuckets {
    pub cup_size: String,
    pub category: String,
}

fn numeric_values(m: &Measurement) -> [f64; 6] {
    [
        m.bra_num,
        m.hips,
        m.waist,
        f64::from(m.size),
        m.height_cm,
        m.bmi_proxy,
    ]
}

impl FeatureEncoder {
    /// Fit statistics and vocabularies on a corpus
    ///
    /// Standard deviation is the population value; a constant column gets
    /// a unit deviation so it encodes to zero.
    pub fn fit<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let mut count = 0usize;
        let mut sums = [0f64; 6];
        let mut sums_sq = [0f64; 6];
        let mut cups = BTreeSet::new();
        let mut categories = BTreeSet::new();

        for row in rows {
            count += 1;
            for (i, value) in numeric_values(row).iter().enumerate() {
                sums[i] += value;
                sums_sq[i] += value * value;
            }

            let cup = normalize_token(&row.cup_size);
            if !cup.is_empty() {
                cups.insert(cup);
            }
            let category = normalize_token(&row.category);
            if !category.is_empty() {
                categories.insert(category);
            }
        }

        if count == 0 {
            return Err(FitCoreError::InvalidConfig(
                "cannot fit encoder on an empty corpus".to_string(),
            ));
        }

        let n = count as f64;
        let numeric = (0..NUMERIC_FEATURES.len())
            .map(|i| {
                let mean = sums[i] / n;
                let variance = (sums_sq[i] / n - mean * mean).max(0.0);
                let std_dev = variance.sqrt();
                ColumnStats {
                    mean,
                    std_dev: if std_dev > 1e-12 { std_dev } else { 1.0 },
                }
            })
            .collect();

        Ok(Self {
            numeric,
            cup_vocabulary: cups.into_iter().collect(),
            category_vocabulary: categories.into_iter().collect(),
        })
    }

    /// Number of encoded columns
    pub fn width(&self) -> usize {
        NUMERIC_FEATURES.len() + self.cup_vocabulary.len() + 1 + self.category_vocabulary.len() + 1
    }

    fn cup_offset(&self) -> usize {
        NUMERIC_FEATURES.len()
    }

    fn category_offset(&self) -> usize {
        self.cup_offset() + self.cup_vocabulary.len() + 1
    }

    /// Column names in encoded order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
        names.extend(self.cup_vocabulary.iter().map(|v| format!("cup_size={v}")));
        names.push(format!("cup_size={UNKNOWN_BUCKET}"));
        names.extend(self.category_vocabulary.iter().map(|v| format!("category={v}")));
        names.push(format!("category={UNKNOWN_BUCKET}"));
        names
    }

    /// Standardize a single numeric value at column `index`
    pub fn standardize(&self, index: usize, value: f64) -> i64 {
        let Some(stats) = self.numeric.get(index) else {
            return 0;
        };
        let z = (value - stats.mean) / stats.std_dev;
        if z.is_finite() {
            (z * SCALE as f64).round() as i64
        } else {
            0
        }
    }

    /// Encode a resolved measurement into a fixed-point feature vector
    pub fn encode(&self, m: &Measurement) -> FeatureVector {
        let mut out = vec![0i64; self.width()];

        for (i, value) in numeric_values(m).iter().enumerate() {
            out[i] = self.standardize(i, *value);
        }

        let cup = normalize_token(&m.cup_size);
        let cup_slot = self
            .cup_vocabulary
            .binary_search(&cup)
            .unwrap_or(self.cup_vocabulary.len());
        out[self.cup_offset() + cup_slot] = SCALE;

        let category = normalize_token(&m.category);
        let category_slot = self
            .category_vocabulary
            .binary_search(&category)
            .unwrap_or(self.category_vocabulary.len());
        out[self.category_offset() + category_slot] = SCALE;

        out
    }

    /// Recover the cup and category buckets from an encoded vector
    ///
    /// Values outside the vocabulary come back as [`UNKNOWN_BUCKET`].
    pub fn decode_categorical(&self, features: &[i64]) -> Option<DecodedBuckets> {
        if features.len() != self.width() {
            return None;
        }

        let cup_cols = &features[self.cup_offset()..self.category_offset()];
        let category_cols = &features[self.category_offset()..];

        let cup_slot = cup_cols.iter().position(|&v| v == SCALE)?;
        let category_slot = category_cols.iter().position(|&v| v == SCALE)?;

        let bucket = |vocab: &[String], slot: usize| {
            vocab
                .get(slot)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_BUCKET.to_string())
        };

        Some(DecodedBuckets {
            cup_size: bucket(&self.cup_vocabulary, cup_slot),
            category: bucket(&self.category_vocabulary, category_slot),
        })
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.numeric.len() != NUMERIC_FEATURES.len() {
            return Err(FitCoreError::InvalidArtifact(format!(
                "encoder has {} numeric columns, expected {}",
                self.numeric.len(),
                NUMERIC_FEATURES.len()
            )));
        }
        for (name, stats) in NUMERIC_FEATURES.iter().zip(&self.numeric) {
            if !stats.mean.is_finite() || !stats.std_dev.is_finite() || stats.std_dev <= 0.0 {
                return Err(FitCoreError::InvalidArtifact(format!(
                    "invalid statistics for {name}: mean={}, std_dev={}",
                    stats.mean, stats.std_dev
                )));
            }
        }
        for (label, vocab) in [
            ("cup_size", &self.cup_vocabulary),
            ("category", &self.category_vocabulary),
        ] {
            let sorted = vocab.windows(2).all(|w| w[0] < w[1]);
            if !sorted || vocab.iter().any(|v| v == UNKNOWN_BUCKET) {
                return Err(FitCoreError::InvalidArtifact(format!(
                    "{label} vocabulary must be sorted, unique and exclude {UNKNOWN_BUCKET}"
                )));
            }
        }
        Ok(())
    }
}
