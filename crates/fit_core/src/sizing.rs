//! Sizing rule configuration
//!
//! A single versioned [`RuleTable`] holds every constant the fit rule
//! depends on:
//! - [`StandardSizeCurve`]: size → standard waist (linear)
//! - [`ToleranceTable`]: category → allowed deviation, hip ratio, physical lock
//! - [`SizeGrid`]: the size × waist domain swept when generating samples
//!
//! Tables load from TOML so constants change without touching code.

use crate::errors::{FitCoreError, Result};
use crate::types::{normalize_token, Category, FitLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

/// Version stamped into artifacts trained against the built-in table
pub const RULE_TABLE_VERSION: u32 = 1;

/// Tolerance applied to categories missing from the table
pub const DEFAULT_TOLERANCE_CM: f64 = 6.0;

/// Hip-to-waist ratio used for fitted categories and unknown categories
pub const FITTED_HIP_RATIO: f64 = 1.4;

/// Reference waist per garment size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardSizeCurve {
    /// Standard waist at size 0 (cm)
    pub base_waist: f64,
    /// Waist added per size step (cm)
    pub waist_step: f64,
}

impl Default for StandardSizeCurve {
    fn default() -> Self {
        Self {
            base_waist: 60.0,
            waist_step: 6.0,
        }
    }
}

impl StandardSizeCurve {
    /// Standard waist for `size`. Sizes beyond the training grid extrapolate.
    pub fn standard_waist(&self, size: u32) -> f64 {
        self.base_waist + f64::from(size) * self.waist_step
    }
}

/// How hip circumference relates to waist for a category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HipRatio {
    /// Hips sampled tightly around `waist * ratio`
    Fixed { ratio: f64 },
    /// Hips drawn from `waist * U(min, max)`
    Range { min: f64, max: f64 },
}

impl HipRatio {
    pub fn midpoint(&self) -> f64 {
        match *self {
            HipRatio::Fixed { ratio } => ratio,
            HipRatio::Range { min, max } => (min + max) / 2.0,
        }
    }
}

/// Per-category fit rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Allowed waist deviation from standard before the fit flips (cm)
    pub tolerance: f64,
    pub hip_ratio: HipRatio,
}

/// Category → tolerance lookup with the physical lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceTable {
    /// Tolerance for categories absent from `categories`
    pub default_tolerance: f64,
    /// Sizes at or below this value never resolve to `Large`
    pub lock_floor: u32,
    pub categories: BTreeMap<String, CategoryRule>,
}

impl Default for ToleranceTable {
    fn default() -> Self {
        let loose = HipRatio::Range {
            min: 1.25,
            max: 1.55,
        };
        let fitted = HipRatio::Fixed {
            ratio: FITTED_HIP_RATIO,
        };

        let mut categories = BTreeMap::new();
        for category in Category::ALL {
            let rule = match category {
                Category::Dresses => CategoryRule {
                    tolerance: 6.0,
                    hip_ratio: fitted,
                },
                Category::Tops => CategoryRule {
                    tolerance: 7.0,
                    hip_ratio: loose,
                },
                Category::Bottoms => CategoryRule {
                    tolerance: 4.0,
                    hip_ratio: fitted,
                },
                Category::Outerwear => CategoryRule {
                    tolerance: 8.0,
                    hip_ratio: loose,
                },
            };
            categories.insert(category.as_str().to_string(), rule);
        }

        Self {
            default_tolerance: DEFAULT_TOLERANCE_CM,
            lock_floor: 1,
            categories,
        }
    }
}

impl ToleranceTable {
    pub fn rule(&self, category: &str) -> Option<&CategoryRule> {
        self.categories.get(&normalize_token(category))
    }

    /// Tolerance for `category`, falling back to `default_tolerance`
    pub fn tolerance(&self, category: &str) -> f64 {
        self.rule(category)
            .map(|rule| rule.tolerance)
            .unwrap_or(self.default_tolerance)
    }

    /// Hip ratio for `category`; unknown categories use the fitted ratio
    pub fn hip_ratio(&self, category: &str) -> HipRatio {
        self.rule(category)
            .map(|rule| rule.hip_ratio)
            .unwrap_or(HipRatio::Fixed {
                ratio: FITTED_HIP_RATIO,
            })
    }

    /// Remap `Large` to `Fit` at or below the lock floor
    pub fn apply_physical_lock(&self, size: u32, label: FitLabel) -> FitLabel {
        if label == FitLabel::Large && size <= self.lock_floor {
            FitLabel::Fit
        } else {
            label
        }
    }

    /// Category names in table order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

/// Size × waist domain covered by the training grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeGrid {
    pub min_size: u32,
    pub max_size: u32,
    /// Waist range in whole centimetres, swept in 1 cm steps
    pub min_waist: u32,
    pub max_waist: u32,
}

impl Default for SizeGrid {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: 18,
            min_waist: 50,
            max_waist: 120,
        }
    }
}

impl SizeGrid {
    pub fn sizes(&self) -> RangeInclusive<u32> {
        self.min_size..=self.max_size
    }

    pub fn waists(&self) -> impl Iterator<Item = f64> {
        (self.min_waist..=self.max_waist).map(f64::from)
    }

    pub fn point_count(&self) -> usize {
        let sizes = (self.max_size - self.min_size + 1) as usize;
        let waists = (self.max_waist - self.min_waist + 1) as usize;
        sizes * waists
    }
}

/// Versioned bundle of every sizing constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub version: u32,
    pub curve: StandardSizeCurve,
    pub tolerances: ToleranceTable,
    pub grid: SizeGrid,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            version: RULE_TABLE_VERSION,
            curve: StandardSizeCurve::default(),
            tolerances: ToleranceTable::default(),
            grid: SizeGrid::default(),
        }
    }
}

impl RuleTable {
    /// Parse and validate a table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: RuleTable = toml::from_str(content)
            .map_err(|e| FitCoreError::InvalidConfig(format!("Failed to parse rule table: {e}")))?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FitCoreError::InvalidConfig(format!("Failed to render rule table: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        let curve = &self.curve;
        if !curve.base_waist.is_finite() || curve.base_waist <= 0.0 {
            return Err(FitCoreError::InvalidConfig(format!(
                "base_waist must be positive, got {}",
                curve.base_waist
            )));
        }
        if !curve.waist_step.is_finite() || curve.waist_step <= 0.0 {
            return Err(FitCoreError::InvalidConfig(format!(
                "waist_step must be positive, got {}",
                curve.waist_step
            )));
        }

        let tolerances = &self.tolerances;
        if tolerances.categories.is_empty() {
            return Err(FitCoreError::InvalidConfig(
                "rule table has no categories".to_string(),
            ));
        }
        if !tolerances.default_tolerance.is_finite() || tolerances.default_tolerance < 0.0 {
            return Err(FitCoreError::InvalidConfig(format!(
                "default_tolerance must be non-negative, got {}",
                tolerances.default_tolerance
            )));
        }

        for (name, rule) in &tolerances.categories {
            if name.is_empty() || *name != normalize_token(name) {
                return Err(FitCoreError::InvalidConfig(format!(
                    "category name {name:?} must be lowercase and trimmed"
                )));
            }
            if !rule.tolerance.is_finite() || rule.tolerance < 0.0 {
                return Err(FitCoreError::InvalidConfig(format!(
                    "category {name}: tolerance must be non-negative, got {}",
                    rule.tolerance
                )));
            }
            match rule.hip_ratio {
                HipRatio::Fixed { ratio } if !(ratio.is_finite() && ratio > 0.0) => {
                    return Err(FitCoreError::InvalidConfig(format!(
                        "category {name}: hip ratio must be positive, got {ratio}"
                    )));
                }
                HipRatio::Range { min, max }
                    if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) =>
                {
                    return Err(FitCoreError::InvalidConfig(format!(
                        "category {name}: invalid hip ratio range {min}..{max}"
                    )));
                }
                _ => {}
            }
        }

        let grid = &self.grid;
        if grid.min_size > grid.max_size {
            return Err(FitCoreError::InvalidConfig(format!(
                "size grid is inverted: {}..={}",
                grid.min_size, grid.max_size
            )));
        }
        if grid.min_waist > grid.max_waist {
            return Err(FitCoreError::InvalidConfig(format!(
                "waist grid is inverted: {}..={}",
                grid.min_waist, grid.max_waist
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_waist_curve() {
        let curve = StandardSizeCurve::default();
        assert_eq!(curve.standard_waist(0), 60.0);
        assert_eq!(curve.standard_waist(3), 78.0);
        assert_eq!(curve.standard_waist(4), 84.0);
        // extrapolation past the grid is allowed
        assert_eq!(curve.standard_waist(30), 240.0);
    }

    #[test]
    fn test_reference_tolerances() {
        let table = ToleranceTable::default();
        assert_eq!(table.tolerance("bottoms"), 4.0);
        assert_eq!(table.tolerance("tops"), 7.0);
        assert_eq!(table.tolerance("outerwear"), 8.0);
        assert_eq!(table.tolerance("dresses"), 6.0);
        assert_eq!(table.tolerance(" Bottoms"), 4.0);
    }

    #[test]
    fn test_unknown_category_uses_default() {
        let table = ToleranceTable::default();
        assert_eq!(table.tolerance("swimwear"), DEFAULT_TOLERANCE_CM);
        assert_eq!(
            table.hip_ratio("swimwear"),
            HipRatio::Fixed {
                ratio: FITTED_HIP_RATIO
            }
        );
    }

    #[test]
    fn test_physical_lock() {
        let table = ToleranceTable::default();
        assert_eq!(table.apply_physical_lock(0, FitLabel::Large), FitLabel::Fit);
        assert_eq!(table.apply_physical_lock(1, FitLabel::Large), FitLabel::Fit);
        assert_eq!(table.apply_physical_lock(2, FitLabel::Large), FitLabel::Large);
        assert_eq!(table.apply_physical_lock(0, FitLabel::Small), FitLabel::Small);
    }

    #[test]
    fn test_toml_roundtrip_and_new_category() {
        let table = RuleTable::default();
        let mut text = table.to_toml_string().unwrap();
        text.push_str(
            "\n[tolerances.categories.swimwear]\ntolerance = 3.0\nhip_ratio = { kind = \"fixed\", ratio = 1.35 }\n",
        );

        let parsed = RuleTable::from_toml_str(&text).unwrap();
        assert_eq!(parsed.tolerances.tolerance("swimwear"), 3.0);
        assert_eq!(parsed.tolerances.tolerance("bottoms"), 4.0);
        assert_eq!(parsed.grid, SizeGrid::default());
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let mut table = RuleTable::default();
        table.curve.waist_step = 0.0;
        assert!(table.validate().is_err());

        let mut table = RuleTable::default();
        table.tolerances.categories.clear();
        assert!(table.validate().is_err());

        let mut table = RuleTable::default();
        table.grid.min_waist = 130;
        assert!(table.validate().is_err());

        let mut table = RuleTable::default();
        table.tolerances.categories.insert(
            "tops".to_string(),
            CategoryRule {
                tolerance: 7.0,
                hip_ratio: HipRatio::Range { min: 1.6, max: 1.2 },
            },
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_grid_point_count() {
        assert_eq!(SizeGrid::default().point_count(), 19 * 71);
    }
}
