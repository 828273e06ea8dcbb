//! Prediction requests and input resolution
//!
//! Request fields are decoded leniently: a missing, `null`, non-numeric,
//! non-finite or negative value is treated as absent and resolved to its
//! default. Decoding never fails on field content.

use crate::types::{normalize_token, Category, Measurement};
use serde::{Deserialize, Serialize};

/// Garment size assumed when the request omits one
pub const DEFAULT_SIZE: u32 = 6;

/// Cup letter assumed when the request omits one
pub const DEFAULT_CUP: &str = "b";

/// Category assumed when the request omits one
pub const DEFAULT_CATEGORY: Category = Category::Dresses;

/// Hips used for prediction whenever waist is known: `waist * HIP_OVERRIDE_RATIO`
pub const HIP_OVERRIDE_RATIO: f64 = 1.4;

/// Raw measurements and garment selection as sent by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<f64>,

    /// Profile-style spelling of `height`, used only when `height` is absent
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub height_cm: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub waist: Option<f64>,

    /// Only consulted when waist resolves to 0
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub hips: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bra_num: Option<f64>,

    /// Profile-style spelling of `bra_num`, used only when `bra_num` is absent
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub bra_size: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient::token",
        skip_serializing_if = "Option::is_none"
    )]
    pub cup_size: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::size",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u32>,

    #[serde(
        default,
        deserialize_with = "lenient::token",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
}

impl FitRequest {
    /// Resolve defaults, apply the hip override and derive the BMI proxy
    pub fn resolve(&self) -> Measurement {
        let height_cm = self.height.or(self.height_cm).unwrap_or(0.0);
        let waist = self.waist.unwrap_or(0.0);

        let hips = if waist > 0.0 {
            waist * HIP_OVERRIDE_RATIO
        } else {
            self.hips.unwrap_or(0.0)
        };

        Measurement {
            cup_size: self
                .cup_size
                .clone()
                .unwrap_or_else(|| DEFAULT_CUP.to_string()),
            bra_num: self.bra_num.or(self.bra_size).unwrap_or(0.0),
            hips,
            waist,
            category: self
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.as_str().to_string()),
            size: self.size.unwrap_or(DEFAULT_SIZE),
            height_cm,
            bmi_proxy: Measurement::compute_bmi_proxy(waist, height_cm),
        }
    }

    /// True when the caller sent a hip value that resolution discards
    pub fn hip_discarded(&self) -> bool {
        matches!((self.waist, self.hips), (Some(w), Some(_)) if w > 0.0)
    }
}

/// Field decoders that map malformed input to `None` instead of erroring
mod lenient {
    use super::normalize_token;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_number(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(as_number))
    }

    pub fn size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(as_number)
            .map(f64::round)
            .filter(|v| *v <= f64::from(u32::MAX))
            .map(|v| v as u32))
    }

    pub fn token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(normalize_token(&s)).filter(|s| !s.is_empty()),
            _ => None,
        })
    }
}
