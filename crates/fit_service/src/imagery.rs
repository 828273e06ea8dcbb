//! Category → product image lookup

use fitcheck_core::types::normalize_token;
use std::collections::BTreeMap;

/// Resolves a display image for a garment category
pub trait ImageryLookup: Send + Sync {
    fn image_url(&self, category: &str) -> String;
}

/// Fixed table with a placeholder for unknown categories
#[derive(Debug, Clone)]
pub struct StaticImagery {
    images: BTreeMap<String, String>,
    placeholder: String,
}

impl StaticImagery {
    pub fn new(images: BTreeMap<String, String>, placeholder: impl Into<String>) -> Self {
        let images = images
            .into_iter()
            .map(|(category, url)| (normalize_token(&category), url))
            .collect();
        Self {
            images,
            placeholder: placeholder.into(),
        }
    }
}

impl ImageryLookup for StaticImagery {
    fn image_url(&self, category: &str) -> String {
        self.images
            .get(&normalize_token(category))
            .cloned()
            .unwrap_or_else(|| self.placeholder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        let mut images = BTreeMap::new();
        images.insert("Dresses".to_string(), "https://img/dress".to_string());
        let imagery = StaticImagery::new(images, "https://img/none");

        assert_eq!(imagery.image_url("dresses"), "https://img/dress");
        assert_eq!(imagery.image_url(" DRESSES "), "https://img/dress");
        assert_eq!(imagery.image_url("outerwear"), "https://img/none");
    }
}
