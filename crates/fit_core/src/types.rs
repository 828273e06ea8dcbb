//! Shared data structures: fit labels, garment categories and measurements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-way fit outcome
///
/// `Small` means the declared size is too small for the body, `Large`
/// means it is too big.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitLabel {
    Small,
    Fit,
    Large,
}

impl FitLabel {
    /// All labels in class-index order
    pub const ALL: [FitLabel; 3] = [FitLabel::Small, FitLabel::Fit, FitLabel::Large];

    /// Number of classes the classifier predicts
    pub const COUNT: usize = 3;

    /// Class index used by the ensemble (small=0, fit=1, large=2)
    pub fn index(self) -> usize {
        match self {
            FitLabel::Small => 0,
            FitLabel::Fit => 1,
            FitLabel::Large => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitLabel::Small => "small",
            FitLabel::Fit => "fit",
            FitLabel::Large => "large",
        }
    }

    /// Capitalised name shown to end users
    pub fn display_name(self) -> &'static str {
        match self {
            FitLabel::Small => "Small",
            FitLabel::Fit => "Fit",
            FitLabel::Large => "Large",
        }
    }
}

impl fmt::Display for FitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(FitLabel::Small),
            "fit" => Ok(FitLabel::Fit),
            "large" => Ok(FitLabel::Large),
            other => Err(format!("unknown fit label: {other}")),
        }
    }
}

/// Built-in garment categories
///
/// The rule table is keyed by category name, so a new category only needs a
/// table row; this enum names the rows shipped by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dresses,
    Tops,
    Bottoms,
    Outerwear,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Dresses,
        Category::Tops,
        Category::Bottoms,
        Category::Outerwear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dresses => "dresses",
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Outerwear => "outerwear",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = normalize_token(s);
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| format!("unknown category: {name}"))
    }
}

/// Lowercase, trimmed form used for every categorical lookup
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// A fully resolved measurement row in feature-schema terms
///
/// Both the training corpus and inference requests end up in this shape
/// before encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub cup_size: String,
    pub bra_num: f64,
    pub hips: f64,
    pub waist: f64,
    pub category: String,
    pub size: u32,
    pub height_cm: f64,
    pub bmi_proxy: f64,
}

impl Measurement {
    /// Waist divided by height, or 0 when height is unknown
    pub fn compute_bmi_proxy(waist: f64, height_cm: f64) -> f64 {
        if height_cm > 0.0 {
            waist / height_cm
        } else {
            0.0
        }
    }

    /// Recompute `bmi_proxy` from the current waist and height
    pub fn refresh_bmi_proxy(&mut self) {
        self.bmi_proxy = Self::compute_bmi_proxy(self.waist, self.height_cm);
    }
}
