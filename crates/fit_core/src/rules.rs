//! Ground-truth fit rule
//!
//! `classify` is the deterministic function the classifier is trained to
//! reproduce. The `sample_*` helpers derive correlated secondary
//! measurements for synthetic rows only; inference never calls them.

use crate::errors::Result;
use crate::sizing::{HipRatio, RuleTable};
use crate::types::FitLabel;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Cup letters emitted by the sample generator
pub const CUP_ALPHABET: [&str; 4] = ["a", "b", "c", "d"];

/// Standard deviation of hips around `waist * ratio` for fixed-ratio categories (cm)
pub const HIP_NOISE_CM: f64 = 1.0;

/// Deterministic sizing rule over a validated [`RuleTable`]
#[derive(Debug, Clone)]
pub struct RuleEngine {
    table: RuleTable,
}

impl RuleEngine {
    pub fn new(table: RuleTable) -> Result<Self> {
        table.validate()?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn standard_waist(&self, size: u32) -> f64 {
        self.table.curve.standard_waist(size)
    }

    pub fn tolerance(&self, category: &str) -> f64 {
        self.table.tolerances.tolerance(category)
    }

    /// Fit label for a body with `waist` wearing `size` of `category`
    ///
    /// `diff = waist - standard_waist(size)`; beyond `+tolerance` the garment
    /// is small, beyond `-tolerance` it is large, then the physical lock
    /// suppresses `Large` at the smallest sizes.
    pub fn classify(&self, size: u32, category: &str, waist: f64) -> FitLabel {
        let diff = waist - self.standard_waist(size);
        let tolerance = self.tolerance(category);

        let label = if diff > tolerance {
            FitLabel::Small
        } else if diff < -tolerance {
            FitLabel::Large
        } else {
            FitLabel::Fit
        };

        self.table.tolerances.apply_physical_lock(size, label)
    }

    /// Nominal band number for a size: 32 for sizes 0-2, +2 every three sizes, capped at 44
    pub fn nominal_band(&self, size: u32) -> f64 {
        let step = (size / 3).min(6);
        32.0 + 2.0 * f64::from(step)
    }

    /// Hip circumference correlated with `waist` per the category's hip ratio
    pub fn sample_hips<R: Rng + ?Sized>(&self, category: &str, waist: f64, rng: &mut R) -> f64 {
        match self.table.tolerances.hip_ratio(category) {
            HipRatio::Fixed { ratio } => {
                let centre = waist * ratio;
                match Normal::new(centre, HIP_NOISE_CM) {
                    Ok(normal) => normal.sample(rng).max(0.0),
                    Err(_) => centre,
                }
            }
            HipRatio::Range { min, max } => {
                let ratio = if max > min { rng.gen_range(min..=max) } else { min };
                waist * ratio
            }
        }
    }

    /// Band number scattered around the size's step value
    pub fn sample_band<R: Rng + ?Sized>(&self, size: u32, sigma: f64, rng: &mut R) -> f64 {
        let nominal = self.nominal_band(size);
        match Normal::new(nominal, sigma) {
            Ok(normal) => normal.sample(rng).max(0.0),
            Err(_) => nominal,
        }
    }

    /// Cup letter drawn uniformly from `alphabet` (falls back to `CUP_ALPHABET`)
    pub fn sample_cup<R: Rng + ?Sized>(&self, alphabet: &[String], rng: &mut R) -> String {
        if alphabet.is_empty() {
            let idx = rng.gen_range(0..CUP_ALPHABET.len());
            return CUP_ALPHABET[idx].to_string();
        }
        let idx = rng.gen_range(0..alphabet.len());
        alphabet[idx].clone()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            table: RuleTable::default(),
        }
    }
}
