//! Synthetic training corpus generation
//!
//! Every category in the rule table gets these kinds of rows:
//! - grid rows: `samples_per_point` noisy draws around each (size, waist)
//!   grid point, labelled at the unperturbed point
//! - reference rows: every grid point once more, shaped exactly like a
//!   request after hip override
//! - background rows: uniformly drawn (size, waist) pairs labelled where
//!   they land, filling the space between grid points
//!
//! On top of that come anchor rows (heavily weighted repeats of important
//! points, in request shape) and ring rows: the rule-labelled neighbours of
//! every anchor within one size and a few centimetres, carrying the same
//! total weight as the anchor so it cannot drag its neighbours to its label.
//!
//! Each category draws from its own RNG stream, so categories generate in
//! parallel and the result does not depend on thread scheduling.

use fitcheck_core::rules::CUP_ALPHABET;
use fitcheck_core::{FitLabel, Measurement, RuleEngine, SizeGrid, HIP_OVERRIDE_RATIO};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{Corpus, TrainingSample};
use crate::deterministic::stream_rng;
use crate::errors::TrainerError;

/// Height used for anchor rows and rule-coverage requests (cm)
pub const REFERENCE_HEIGHT_CM: f64 = 165.0;

/// Band number used for anchor rows and rule-coverage requests
pub const REFERENCE_BAND: f64 = 34.0;

/// Cup letter used for anchor rows and rule-coverage requests
pub const REFERENCE_CUP: &str = "b";

const BACKGROUND_STREAM_OFFSET: u64 = 1 << 32;

/// A heavily weighted training point; its label always comes from the rule engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub size: u32,
    pub waist: f64,
    pub category: String,
    pub repeats: usize,
    pub weight: f64,
}

impl AnchorPoint {
    pub fn new(category: &str, size: u32, waist: f64) -> Self {
        Self {
            size,
            waist,
            category: category.to_string(),
            repeats: 200,
            weight: 5.0,
        }
    }

    /// Measurement in the canonical request shape
    pub fn measurement(&self) -> Measurement {
        reference_measurement(&self.category, self.size, self.waist)
    }

    /// (size, waist) points around the anchor, excluding the anchor itself
    ///
    /// Sizes stay inside `grid`; waists step in whole centimetres.
    pub fn ring(&self, grid: SizeGrid, size_radius: u32, waist_radius: u32) -> Vec<(u32, f64)> {
        let low = self.size.saturating_sub(size_radius).max(grid.min_size);
        let high = self.size.saturating_add(size_radius).min(grid.max_size);
        let reach = waist_radius as i32;

        let mut points = Vec::new();
        for size in low..=high {
            for offset in -reach..=reach {
                if size == self.size && offset == 0 {
                    continue;
                }
                let waist = self.waist + f64::from(offset);
                if waist > 0.0 {
                    points.push((size, waist));
                }
            }
        }
        points
    }
}

/// A body at the reference height, band and cup, with hips from the override ratio
pub fn reference_measurement(category: &str, size: u32, waist: f64) -> Measurement {
    Measurement {
        cup_size: REFERENCE_CUP.to_string(),
        bra_num: REFERENCE_BAND,
        hips: waist * HIP_OVERRIDE_RATIO,
        waist,
        category: category.to_string(),
        size,
        height_cm: REFERENCE_HEIGHT_CM,
        bmi_proxy: 0.0,
    }
}

/// Default anchor set covering the historically fragile points
pub fn default_anchors() -> Vec<AnchorPoint> {
    vec![
        AnchorPoint::new("dresses", 0, 60.0),
        AnchorPoint::new("dresses", 0, 78.0),
        AnchorPoint::new("dresses", 1, 78.0),
        AnchorPoint::new("dresses", 3, 78.0),
        AnchorPoint::new("dresses", 4, 78.0),
        AnchorPoint::new("bottoms", 3, 78.0),
        AnchorPoint::new("bottoms", 4, 78.0),
        AnchorPoint::new("bottoms", 0, 66.0),
        AnchorPoint::new("outerwear", 0, 67.0),
        AnchorPoint::new("tops", 2, 79.0),
    ]
}

/// Sampling configuration for the synthetic corpus
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub samples_per_point: usize,
    /// Gaussian noise added to the grid waist (cm)
    pub waist_noise_sd: f64,
    pub height_mean: f64,
    pub height_sd: f64,
    pub height_min: f64,
    pub height_max: f64,
    pub band_noise_sd: f64,
    pub cup_alphabet: Vec<String>,
    /// Request-shaped rows per grid point
    pub reference_rows_per_point: usize,
    /// Uniformly drawn rows per category
    pub background_per_category: usize,
    pub seed: u64,
    pub anchors: Vec<AnchorPoint>,
    /// Sizes either side of an anchor covered by its ring
    pub ring_size_radius: u32,
    /// Centimetres either side of an anchor waist covered by its ring
    pub ring_waist_radius: u32,
    /// Rows per ring point; their weight is scaled to match the anchor's total
    pub ring_repeats: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples_per_point: 4,
            waist_noise_sd: 0.5,
            height_mean: 165.0,
            height_sd: 7.0,
            height_min: 145.0,
            height_max: 195.0,
            band_noise_sd: 1.0,
            cup_alphabet: CUP_ALPHABET.iter().map(|c| c.to_string()).collect(),
            reference_rows_per_point: 1,
            background_per_category: 2000,
            seed: 42,
            anchors: default_anchors(),
            ring_size_radius: 1,
            ring_waist_radius: 4,
            ring_repeats: 50,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        let non_negative = [
            ("waist_noise_sd", self.waist_noise_sd),
            ("height_sd", self.height_sd),
            ("band_noise_sd", self.band_noise_sd),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TrainerError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(self.height_min > 0.0 && self.height_min <= self.height_max) {
            return Err(TrainerError::Config(format!(
                "invalid height range {}..={}",
                self.height_min, self.height_max
            )));
        }
        if self.samples_per_point == 0 && self.background_per_category == 0 {
            return Err(TrainerError::Config(
                "samples_per_point and background_per_category are both zero".to_string(),
            ));
        }
        let has_ring = self.ring_size_radius > 0 || self.ring_waist_radius > 0;
        if has_ring && !self.anchors.is_empty() && self.ring_repeats == 0 {
            return Err(TrainerError::Config(
                "ring_repeats must be positive when anchors have a ring".to_string(),
            ));
        }
        for anchor in &self.anchors {
            if anchor.repeats == 0 || !(anchor.weight.is_finite() && anchor.weight > 0.0) {
                return Err(TrainerError::Config(format!(
                    "anchor {}/{}/{} needs positive repeats and weight",
                    anchor.category, anchor.size, anchor.waist
                )));
            }
            if anchor.category.trim().is_empty() || !anchor.waist.is_finite() {
                return Err(TrainerError::Config(format!(
                    "anchor has invalid category or waist: {anchor:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Builds the labelled corpus from the rule engine
pub struct SampleGenerator<'a> {
    engine: &'a RuleEngine,
    config: GeneratorConfig,
}

impl<'a> SampleGenerator<'a> {
    pub fn new(engine: &'a RuleEngine, config: GeneratorConfig) -> Result<Self, TrainerError> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the merged, shuffled corpus with `bmi_proxy` populated
    pub fn generate(&self) -> Corpus {
        let categories: Vec<&str> = self.engine.table().tolerances.category_names().collect();

        let per_category: Vec<Corpus> = categories
            .par_iter()
            .enumerate()
            .map(|(stream, category)| {
                let mut corpus = self.grid_rows(stream as u64, category);
                corpus.extend(self.reference_rows(category));
                corpus.extend(self.background_rows(stream as u64, category));
                corpus
            })
            .collect();

        let mut corpus = Corpus::new();
        for (category, rows) in categories.iter().zip(per_category) {
            debug!("Generated {} rows for {}", rows.len(), category);
            corpus.extend(rows);
        }
        corpus.extend(self.anchor_rows());
        corpus.extend(self.ring_rows());

        corpus.derive_bmi_proxy();
        corpus.shuffle(self.config.seed);

        info!(
            "Corpus ready: {} rows ({} anchor rows) across {} categories",
            corpus.len(),
            corpus.anchor_count(),
            categories.len()
        );
        corpus
    }

    fn grid_rows(&self, stream: u64, category: &str) -> Corpus {
        let grid = self.engine.table().grid;
        let mut rng = stream_rng(self.config.seed, stream);
        let mut corpus = Corpus::new();
        corpus
            .samples
            .reserve(grid.point_count() * self.config.samples_per_point);

        for size in grid.sizes() {
            for waist in grid.waists() {
                // label belongs to the grid point, not the perturbed draw
                let label = self.engine.classify(size, category, waist);
                for _ in 0..self.config.samples_per_point {
                    let noisy = gaussian(&mut rng, waist, self.config.waist_noise_sd).max(1.0);
                    corpus.push(self.sample_row(&mut rng, category, size, noisy, label));
                }
            }
        }
        corpus
    }

    fn reference_rows(&self, category: &str) -> Corpus {
        let grid = self.engine.table().grid;
        let mut corpus = Corpus::new();
        for size in grid.sizes() {
            for waist in grid.waists() {
                let sample = TrainingSample {
                    measurement: reference_measurement(category, size, waist),
                    label: self.engine.classify(size, category, waist),
                    weight: 1.0,
                    anchor: false,
                };
                corpus.samples.extend(
                    std::iter::repeat(sample).take(self.config.reference_rows_per_point),
                );
            }
        }
        corpus
    }

    fn background_rows(&self, stream: u64, category: &str) -> Corpus {
        let grid = self.engine.table().grid;
        let mut rng = stream_rng(self.config.seed, BACKGROUND_STREAM_OFFSET + stream);
        let mut corpus = Corpus::new();

        let min_waist = f64::from(grid.min_waist);
        let max_waist = f64::from(grid.max_waist);
        for _ in 0..self.config.background_per_category {
            let size = rng.gen_range(grid.min_size..=grid.max_size);
            let waist = if max_waist > min_waist {
                rng.gen_range(min_waist..=max_waist)
            } else {
                min_waist
            };
            let label = self.engine.classify(size, category, waist);
            corpus.push(self.sample_row(&mut rng, category, size, waist, label));
        }
        corpus
    }

    fn anchor_rows(&self) -> Corpus {
        let mut corpus = Corpus::new();
        for anchor in &self.config.anchors {
            let label = self
                .engine
                .classify(anchor.size, &anchor.category, anchor.waist);
            debug!(
                "Anchor {} size {} waist {:.1} -> {} x{} (weight {})",
                anchor.category, anchor.size, anchor.waist, label, anchor.repeats, anchor.weight
            );
            let sample = TrainingSample {
                measurement: anchor.measurement(),
                label,
                weight: anchor.weight,
                anchor: true,
            };
            corpus
                .samples
                .extend(std::iter::repeat(sample).take(anchor.repeats));
        }
        corpus
    }

    fn ring_rows(&self) -> Corpus {
        let grid = self.engine.table().grid;
        let mut corpus = Corpus::new();
        if self.config.ring_repeats == 0 {
            return corpus;
        }
        for anchor in &self.config.anchors {
            let points = anchor.ring(
                grid,
                self.config.ring_size_radius,
                self.config.ring_waist_radius,
            );
            let weight = anchor.weight * anchor.repeats as f64 / self.config.ring_repeats as f64;
            for (size, waist) in points {
                let sample = TrainingSample {
                    measurement: reference_measurement(&anchor.category, size, waist),
                    label: self.engine.classify(size, &anchor.category, waist),
                    weight,
                    anchor: false,
                };
                corpus
                    .samples
                    .extend(std::iter::repeat(sample).take(self.config.ring_repeats));
            }
        }
        corpus
    }

    fn sample_row(
        &self,
        rng: &mut StdRng,
        category: &str,
        size: u32,
        waist: f64,
        label: FitLabel,
    ) -> TrainingSample {
        let height = gaussian(rng, self.config.height_mean, self.config.height_sd)
            .clamp(self.config.height_min, self.config.height_max);
        let hips = self.engine.sample_hips(category, waist, rng);
        let bra_num = self
            .engine
            .sample_band(size, self.config.band_noise_sd, rng);
        let cup_size = self.engine.sample_cup(&self.config.cup_alphabet, rng);

        TrainingSample {
            measurement: Measurement {
                cup_size,
                bra_num,
                hips,
                waist,
                category: category.to_string(),
                size,
                height_cm: height,
                bmi_proxy: 0.0,
            },
            label,
            weight: 1.0,
            anchor: false,
        }
    }
}

fn gaussian(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    match Normal::new(mean, sd) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitcheck_core::RuleTable;

    fn small_engine() -> RuleEngine {
        let mut table = RuleTable::default();
        table.grid = SizeGrid {
            min_size: 0,
            max_size: 4,
            min_waist: 55,
            max_waist: 95,
        };
        RuleEngine::new(table).unwrap()
    }

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            samples_per_point: 2,
            reference_rows_per_point: 0,
            ring_size_radius: 0,
            ring_waist_radius: 0,
            background_per_category: 50,
            anchors: vec![AnchorPoint {
                repeats: 10,
                ..AnchorPoint::new("bottoms", 4, 78.0)
            }],
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_corpus_composition() {
        let engine = small_engine();
        let corpus = SampleGenerator::new(&engine, small_config())
            .unwrap()
            .generate();

        let grid_rows = 4 * 5 * 41 * 2;
        assert_eq!(corpus.len(), grid_rows + 4 * 50 + 10);
        assert_eq!(corpus.anchor_count(), 10);
        assert_eq!(corpus.category_counts()["tops"], 5 * 41 * 2 + 50);
    }

    #[test]
    fn test_every_row_has_bmi_proxy() {
        let engine = small_engine();
        let corpus = SampleGenerator::new(&engine, small_config())
            .unwrap()
            .generate();
        for sample in &corpus.samples {
            let m = &sample.measurement;
            assert!(m.bmi_proxy > 0.0);
            assert!((m.bmi_proxy - m.waist / m.height_cm).abs() < 1e-12);
            assert!((145.0..=195.0).contains(&m.height_cm) || sample.anchor);
        }
    }

    #[test]
    fn test_anchor_label_comes_from_rule() {
        let engine = small_engine();
        let corpus = SampleGenerator::new(&engine, small_config())
            .unwrap()
            .generate();
        let anchors: Vec<_> = corpus.samples.iter().filter(|s| s.anchor).collect();
        assert!(anchors.iter().all(|s| s.label == FitLabel::Large));
        assert!(anchors.iter().all(|s| s.weight == 5.0));
        assert!(anchors
            .iter()
            .all(|s| (s.measurement.hips - 78.0 * HIP_OVERRIDE_RATIO).abs() < 1e-9));
    }

    #[test]
    fn test_grid_labels_follow_grid_point() {
        // with zero waist noise every grid row sits on its grid point
        let engine = small_engine();
        let config = GeneratorConfig {
            waist_noise_sd: 0.0,
            background_per_category: 0,
            anchors: Vec::new(),
            ..small_config()
        };
        let corpus = SampleGenerator::new(&engine, config).unwrap().generate();
        for sample in &corpus.samples {
            let m = &sample.measurement;
            assert_eq!(sample.label, engine.classify(m.size, &m.category, m.waist));
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let engine = small_engine();
        let a = SampleGenerator::new(&engine, small_config())
            .unwrap()
            .generate();
        let b = SampleGenerator::new(&engine, small_config())
            .unwrap()
            .generate();
        assert_eq!(a.samples, b.samples);

        let other_seed = GeneratorConfig {
            seed: 7,
            ..small_config()
        };
        let c = SampleGenerator::new(&engine, other_seed).unwrap().generate();
        assert_ne!(a.samples, c.samples);
    }

    #[test]
    fn test_ring_stays_inside_size_grid() {
        let grid = SizeGrid::default();
        let ring = AnchorPoint::new("bottoms", 0, 66.0).ring(grid, 1, 4);
        assert_eq!(ring.len(), 2 * 9 - 1);
        assert!(ring.iter().all(|&(size, _)| size <= 1));
        assert!(!ring.contains(&(0, 66.0)));
        assert!(ring.contains(&(1, 66.0)));
        assert!(ring.contains(&(1, 70.0)));
        assert!(ring.contains(&(0, 62.0)));

        let top = AnchorPoint::new("tops", 18, 120.0).ring(grid, 1, 0);
        assert_eq!(top, vec![(17, 120.0)]);
    }

    #[test]
    fn test_ring_rows_follow_rule_with_anchor_mass() {
        let engine = small_engine();
        let config = GeneratorConfig {
            samples_per_point: 0,
            background_per_category: 1,
            anchors: vec![AnchorPoint {
                repeats: 40,
                ..AnchorPoint::new("bottoms", 0, 66.0)
            }],
            ring_size_radius: 1,
            ring_waist_radius: 4,
            ring_repeats: 10,
            ..small_config()
        };
        let corpus = SampleGenerator::new(&engine, config).unwrap().generate();

        let ring: Vec<_> = corpus
            .samples
            .iter()
            .filter(|s| !s.anchor && s.weight > 1.0)
            .collect();
        assert_eq!(ring.len(), (2 * 9 - 1) * 10);
        for sample in &ring {
            let m = &sample.measurement;
            assert_eq!(sample.label, engine.classify(m.size, &m.category, m.waist));
            assert_eq!(sample.weight, 5.0 * 40.0 / 10.0);
            assert_eq!(m.height_cm, REFERENCE_HEIGHT_CM);
            assert!((m.hips - m.waist * HIP_OVERRIDE_RATIO).abs() < 1e-9);
        }

        // the size-1 neighbour at the anchor waist is a fit, not a small
        let neighbour = ring
            .iter()
            .find(|s| s.measurement.size == 1 && s.measurement.waist == 66.0)
            .unwrap();
        assert_eq!(neighbour.label, FitLabel::Fit);
    }

    #[test]
    fn test_reference_rows_cover_grid() {
        let engine = small_engine();
        let config = GeneratorConfig {
            samples_per_point: 0,
            reference_rows_per_point: 1,
            background_per_category: 1,
            anchors: Vec::new(),
            ..small_config()
        };
        let corpus = SampleGenerator::new(&engine, config).unwrap().generate();
        let reference: Vec<_> = corpus
            .samples
            .iter()
            .filter(|s| {
                s.measurement.height_cm == REFERENCE_HEIGHT_CM
                    && s.measurement.bra_num == REFERENCE_BAND
            })
            .collect();
        assert_eq!(reference.len(), 4 * 5 * 41);
        for sample in reference {
            let m = &sample.measurement;
            assert_eq!(sample.label, engine.classify(m.size, &m.category, m.waist));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let engine = small_engine();
        let config = GeneratorConfig {
            height_sd: -1.0,
            ..GeneratorConfig::default()
        };
        assert!(SampleGenerator::new(&engine, config).is_err());

        let config = GeneratorConfig {
            anchors: vec![AnchorPoint {
                repeats: 0,
                ..AnchorPoint::new("tops", 2, 79.0)
            }],
            ..GeneratorConfig::default()
        };
        assert!(SampleGenerator::new(&engine, config).is_err());
    }
}
