//! Prediction service: request decoding, inference and response shaping
//!
//! Transport-agnostic. A caller hands in a JSON body (or an already decoded
//! [`FitRequest`]) and gets a [`PredictResponse`] or a [`ServiceError`] that
//! carries its own status code and error body.

use crate::config::ServiceConfig;
use crate::errors::{Result, ServiceError};
use crate::imagery::{ImageryLookup, StaticImagery};
use fitcheck_core::{
    ArtifactSlot, ClassProbabilities, FitLabel, FitRequest, Measurement, ModelArtifact,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Response body for a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Human readable label: "Small", "Fit" or "Large"
    pub result: String,
    pub label: FitLabel,
    /// Fit-class probability, e.g. "87.3%"
    pub confidence: String,
    pub image_url: String,
    /// Class probabilities as percentages with one decimal
    pub probs: ClassProbabilities,
    /// Values actually used for prediction, after defaults and hip override
    pub measurement: Measurement,
}

/// Readiness snapshot for health reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub ready: bool,
    pub model_path: PathBuf,
    pub model_hash: Option<String>,
    pub rules_version: Option<u32>,
    pub trees: Option<usize>,
}

pub struct FitService {
    config: ServiceConfig,
    slot: ArtifactSlot,
    imagery: Box<dyn ImageryLookup>,
}

impl FitService {
    /// Start the service; a missing artifact leaves it running but not ready
    pub fn new(config: ServiceConfig) -> Self {
        let imagery = Box::new(StaticImagery::new(
            config.imagery.clone(),
            config.placeholder_image.clone(),
        ));
        Self::with_imagery(config, imagery)
    }

    pub fn with_imagery(config: ServiceConfig, imagery: Box<dyn ImageryLookup>) -> Self {
        let slot = ArtifactSlot::load_or_empty(&config.model_path);
        if !slot.is_loaded() {
            warn!(
                "No usable model at {}; predictions unavailable until reload",
                config.model_path.display()
            );
        }
        Self {
            config,
            slot,
            imagery,
        }
    }

    /// Service over an in-memory artifact
    pub fn from_artifact(config: ServiceConfig, artifact: ModelArtifact) -> Self {
        let imagery = Box::new(StaticImagery::new(
            config.imagery.clone(),
            config.placeholder_image.clone(),
        ));
        Self {
            config,
            slot: ArtifactSlot::with_artifact(artifact),
            imagery,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_loaded()
    }

    /// Decode a JSON body and predict
    ///
    /// The body must be a JSON object; individual fields never fail decoding.
    pub fn predict_json(&self, body: &str) -> Result<PredictResponse> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ServiceError::BadRequest(format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(ServiceError::BadRequest(
                "request body must be a JSON object".to_string(),
            ));
        }
        let request = FitRequest::deserialize(value)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        self.predict(&request)
    }

    pub fn predict(&self, request: &FitRequest) -> Result<PredictResponse> {
        let service = self.slot.service()?;
        let prediction = service.predict(request)?;

        let category = &prediction.measurement.category;
        let response = PredictResponse {
            result: prediction.label.display_name().to_string(),
            label: prediction.label,
            confidence: prediction.probabilities.fit_confidence(),
            image_url: self.imagery.image_url(category),
            probs: prediction.probabilities.as_percentages(),
            measurement: prediction.measurement,
        };
        debug!(
            "Predicted {} for {} size {} (fit {})",
            response.result,
            response.measurement.category,
            response.measurement.size,
            response.confidence
        );
        Ok(response)
    }

    /// Reload the configured artifact; on failure the current one stays active
    pub fn reload(&self) -> Result<()> {
        let path = self.config.model_path.clone();
        self.reload_from(path)
    }

    pub fn reload_from<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.slot.reload(path).map_err(|err| {
            warn!(
                "Reload from {} failed ({}); keeping current model",
                path.display(),
                err
            );
            ServiceError::from(err)
        })
    }

    pub fn status(&self) -> ServiceStatus {
        let snapshot = self.slot.snapshot();
        let artifact = snapshot.as_ref().map(|(artifact, _)| artifact);
        ServiceStatus {
            ready: artifact.is_some(),
            model_path: self.config.model_path.clone(),
            model_hash: snapshot.as_ref().and_then(|(_, hash)| hash.clone()),
            rules_version: artifact.map(|a| a.rules_version),
            trees: artifact.map(|a| a.ensemble.num_trees()),
        }
    }
}
