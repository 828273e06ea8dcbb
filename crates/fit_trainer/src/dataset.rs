//! Training corpus and its encoded form
//!
//! A [`Corpus`] holds labelled synthetic rows; it lives only for the
//! duration of a training run. [`EncodedDataset`] is the fixed-point matrix
//! the tree builder consumes.

use fitcheck_core::{FeatureEncoder, FitLabel, Measurement, FEATURE_SCHEMA};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::deterministic::stream_rng;
use crate::errors::TrainerError;

/// RNG stream reserved for the final corpus shuffle
const SHUFFLE_STREAM: u64 = u64::MAX;

/// One labelled synthetic row
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    pub measurement: Measurement,
    pub label: FitLabel,
    /// Loss weight; ordinary rows use 1.0, anchors use more
    pub weight: f64,
    pub anchor: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Corpus {
    pub samples: Vec<TrainingSample>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn extend(&mut self, other: Corpus) {
        self.samples.extend(other.samples);
    }

    pub fn push(&mut self, sample: TrainingSample) {
        self.samples.push(sample);
    }

    /// Populate `bmi_proxy` on every row, anchors included
    pub fn derive_bmi_proxy(&mut self) {
        for sample in &mut self.samples {
            sample.measurement.refresh_bmi_proxy();
        }
    }

    /// Deterministically shuffle the rows
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = stream_rng(seed, SHUFFLE_STREAM);
        self.samples.shuffle(&mut rng);
    }

    pub fn anchor_count(&self) -> usize {
        self.samples.iter().filter(|s| s.anchor).count()
    }

    pub fn label_counts(&self) -> BTreeMap<FitLabel, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label).or_insert(0) += 1;
        }
        counts
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts
                .entry(sample.measurement.category.clone())
                .or_insert(0) += 1;
        }
        counts
    }

    /// Fit an encoder on this corpus and encode every row
    pub fn encode(&self) -> Result<(FeatureEncoder, EncodedDataset), TrainerError> {
        if self.is_empty() {
            return Err(TrainerError::Dataset("corpus is empty".to_string()));
        }
        let encoder = FeatureEncoder::fit(self.samples.iter().map(|s| &s.measurement))?;
        let dataset = EncodedDataset::from_corpus(self, &encoder);
        Ok((encoder, dataset))
    }

    /// Write the corpus as CSV: schema columns, then label and weight
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainerError> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut out = std::io::BufWriter::new(file);

        writeln!(out, "{},label,weight", FEATURE_SCHEMA.join(","))?;
        for sample in &self.samples {
            let m = &sample.measurement;
            writeln!(
                out,
                "{},{:.3},{:.3},{:.3},{},{},{:.3},{:.6},{},{}",
                m.cup_size,
                m.bra_num,
                m.hips,
                m.waist,
                m.category,
                m.size,
                m.height_cm,
                m.bmi_proxy,
                sample.label,
                sample.weight
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Fixed-point training matrix with labels and weights
#[derive(Clone, Debug)]
pub struct EncodedDataset {
    pub features: Vec<Vec<i64>>,
    /// Class index per row (see [`FitLabel::index`])
    pub labels: Vec<usize>,
    pub weights: Vec<f64>,
    pub feature_count: usize,
}

impl EncodedDataset {
    pub fn from_corpus(corpus: &Corpus, encoder: &FeatureEncoder) -> Self {
        let mut features = Vec::with_capacity(corpus.len());
        let mut labels = Vec::with_capacity(corpus.len());
        let mut weights = Vec::with_capacity(corpus.len());

        for sample in &corpus.samples {
            features.push(encoder.encode(&sample.measurement));
            labels.push(sample.label.index());
            weights.push(sample.weight);
        }

        Self {
            features,
            labels,
            weights,
            feature_count: encoder.width(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Per-column (min, max) for diagnostics
    pub fn feature_stats(&self) -> Vec<(i64, i64)> {
        let mut stats = vec![(i64::MAX, i64::MIN); self.feature_count];

        for row in &self.features {
            for (i, &val) in row.iter().enumerate() {
                stats[i].0 = stats[i].0.min(val);
                stats[i].1 = stats[i].1.max(val);
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(waist: f64, label: FitLabel, anchor: bool) -> TrainingSample {
        TrainingSample {
            measurement: Measurement {
                cup_size: "b".to_string(),
                bra_num: 34.0,
                hips: waist * 1.4,
                waist,
                category: "dresses".to_string(),
                size: 3,
                height_cm: 160.0,
                bmi_proxy: 0.0,
            },
            label,
            weight: if anchor { 5.0 } else { 1.0 },
            anchor,
        }
    }

    fn corpus() -> Corpus {
        let mut corpus = Corpus::new();
        corpus.push(sample(70.0, FitLabel::Large, false));
        corpus.push(sample(78.0, FitLabel::Fit, false));
        corpus.push(sample(90.0, FitLabel::Small, true));
        corpus
    }

    #[test]
    fn test_bmi_proxy_derived_for_all_rows() {
        let mut corpus = corpus();
        corpus.derive_bmi_proxy();
        assert!(corpus.samples.iter().all(|s| s.measurement.bmi_proxy > 0.0));
        assert!((corpus.samples[1].measurement.bmi_proxy - 78.0 / 160.0).abs() < 1e-12);
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut a = corpus();
        for i in 0..50 {
            a.push(sample(60.0 + i as f64, FitLabel::Fit, false));
        }
        let mut b = a.clone();
        a.shuffle(42);
        b.shuffle(42);
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn test_counts() {
        let corpus = corpus();
        assert_eq!(corpus.anchor_count(), 1);
        assert_eq!(corpus.label_counts()[&FitLabel::Fit], 1);
        assert_eq!(corpus.category_counts()["dresses"], 3);
    }

    #[test]
    fn test_encode_shapes() {
        let (encoder, dataset) = corpus().encode().unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_count, encoder.width());
        assert_eq!(dataset.labels, vec![2, 1, 0]);
        assert_eq!(dataset.weights, vec![1.0, 1.0, 5.0]);

        let stats = dataset.feature_stats();
        assert_eq!(stats.len(), encoder.width());
        assert!(stats[2].0 < stats[2].1);
    }

    #[test]
    fn test_empty_corpus_rejected() {
        assert!(Corpus::new().encode().is_err());
    }

    #[test]
    fn test_write_csv() {
        let file = tempfile::NamedTempFile::new().unwrap();
        corpus().write_csv(file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "cup_size,bra_num,hips,waist,category,size,height_cm,bmi_proxy,label,weight"
        );
        assert!(lines[3].ends_with(",small,5"));
    }
}
