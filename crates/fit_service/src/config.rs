//! Service configuration
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, then environment overrides.

use crate::errors::{Result, ServiceError};
use fitcheck_core::MODEL_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a TOML config file
pub const CONFIG_ENV: &str = "FITCHECK_CONFIG";

/// Environment variable overriding the artifact path
pub const MODEL_PATH_ENV: &str = "FITCHECK_MODEL_PATH";

pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://placehold.co/300x400?text=No+Image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Location of the trained artifact
    pub model_path: PathBuf,
    /// Category → product image URL
    pub imagery: BTreeMap<String, String>,
    /// Image returned for categories without an entry
    pub placeholder_image: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let imagery = [
            (
                "dresses",
                "https://images.unsplash.com/photo-1595777457583-95e059d581b8?w=400&h=500&fit=crop",
            ),
            (
                "tops",
                "https://images.unsplash.com/photo-1434389677669-e08b4cac3105?w=400&h=500&fit=crop",
            ),
            (
                "bottoms",
                "https://images.unsplash.com/photo-1541099649105-f69ad21f3246?w=400&h=500&fit=crop",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            model_path: Path::new("models").join(MODEL_FILE_NAME),
            imagery,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse a config from TOML text; omitted keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(content)
            .map_err(|e| ServiceError::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` (or `FITCHECK_CONFIG`) when given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(MODEL_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.model_path = PathBuf::from(path.trim());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(ServiceError::ConfigError("model_path is empty".to_string()));
        }
        if self.placeholder_image.trim().is_empty() {
            return Err(ServiceError::ConfigError(
                "placeholder_image is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/fit_model.json"));
        assert_eq!(config.imagery.len(), 3);
        assert!(!config.imagery.contains_key("outerwear"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
model_path = "/srv/fit/model.json"

[imagery]
outerwear = "https://example.com/coat.jpg"
"#,
        )
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("/srv/fit/model.json"));
        assert_eq!(config.imagery.len(), 1);
        assert_eq!(config.placeholder_image, DEFAULT_PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_env_override() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| match key {
            MODEL_PATH_ENV => Some(" /tmp/other.json ".to_string()),
            _ => None,
        });
        assert_eq!(config.model_path, PathBuf::from("/tmp/other.json"));

        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.model_path, PathBuf::from("/tmp/other.json"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ServiceConfig::from_toml_str("placeholder_image = \"\"").is_err());
        assert!(ServiceConfig::from_toml_str("model_path = 3").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(&path, "placeholder_image = \"https://example.com/none.png\"\n").unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.placeholder_image, "https://example.com/none.png");
        assert!(ServiceConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
