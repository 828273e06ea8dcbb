//! Request-time inference over a loaded artifact
//!
//! [`InferenceService`] is a pure function of (request, artifact) and holds
//! no mutable state. [`ArtifactSlot`] owns the currently active artifact and
//! replaces it wholesale; callers take an `Arc` snapshot, so in-flight
//! predictions keep the artifact they started with.

use crate::artifact::ModelArtifact;
use crate::errors::{FitCoreError, Result};
use crate::request::FitRequest;
use crate::types::{FitLabel, Measurement};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-class probabilities in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub small: f64,
    pub fit: f64,
    pub large: f64,
}

impl ClassProbabilities {
    pub fn from_slice(probs: &[f64]) -> Option<Self> {
        match *probs {
            [small, fit, large] => Some(Self { small, fit, large }),
            _ => None,
        }
    }

    pub fn get(&self, label: FitLabel) -> f64 {
        match label {
            FitLabel::Small => self.small,
            FitLabel::Fit => self.fit,
            FitLabel::Large => self.large,
        }
    }

    /// Most probable label; ties resolve to the lower class index
    pub fn argmax(&self) -> FitLabel {
        let mut best = FitLabel::Small;
        for label in [FitLabel::Fit, FitLabel::Large] {
            if self.get(label) > self.get(best) {
                best = label;
            }
        }
        best
    }

    /// Probabilities as percentages rounded to one decimal
    pub fn as_percentages(&self) -> Self {
        let pct = |p: f64| (p * 1000.0).round() / 10.0;
        Self {
            small: pct(self.small),
            fit: pct(self.fit),
            large: pct(self.large),
        }
    }

    /// Confidence that the garment fits, e.g. `"87.3%"`
    ///
    /// Reports the fit-class probability regardless of the winning label.
    pub fn fit_confidence(&self) -> String {
        format!("{:.1}%", self.fit * 100.0)
    }
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: FitLabel,
    pub probabilities: ClassProbabilities,
    /// Inputs as actually fed to the encoder (defaults and hip override applied)
    pub measurement: Measurement,
}

/// Stateless predictor bound to one artifact snapshot
#[derive(Debug, Clone)]
pub struct InferenceService {
    artifact: Arc<ModelArtifact>,
}

impl InferenceService {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Resolve a raw request and predict its fit
    pub fn predict(&self, request: &FitRequest) -> Result<Prediction> {
        let measurement = request.resolve();
        if request.hip_discarded() {
            debug!(
                "Hip override: using {:.1} (waist {:.1}), discarding client hips {:?}",
                measurement.hips, measurement.waist, request.hips
            );
        }
        self.predict_measurement(measurement)
    }

    /// Predict an already resolved measurement
    pub fn predict_measurement(&self, measurement: Measurement) -> Result<Prediction> {
        let encoder = &self.artifact.encoder;
        let ensemble = &self.artifact.ensemble;

        let features = encoder.encode(&measurement);
        if features.len() != ensemble.feature_count {
            return Err(FitCoreError::Prediction(format!(
                "encoded {} features but ensemble expects {}",
                features.len(),
                ensemble.feature_count
            )));
        }

        let probs = ensemble.probabilities(&features);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(FitCoreError::Prediction(format!(
                "non-finite class probabilities {probs:?}"
            )));
        }
        let probabilities = ClassProbabilities::from_slice(&probs).ok_or_else(|| {
            FitCoreError::Prediction(format!("expected 3 class probabilities, got {}", probs.len()))
        })?;

        Ok(Prediction {
            label: probabilities.argmax(),
            probabilities,
            measurement,
        })
    }
}

/// Active artifact with the digest computed when it was installed
#[derive(Debug, Clone)]
struct Active {
    artifact: Arc<ModelArtifact>,
    hash: Option<String>,
}

/// Holder for the active artifact with atomic replacement
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: RwLock<Option<Active>>,
}

impl ArtifactSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        let slot = Self::empty();
        slot.swap(artifact);
        slot
    }

    /// Load from disk; an absent or unreadable artifact leaves the slot empty
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let slot = Self::empty();
        match ModelArtifact::load_verified(path) {
            Ok((artifact, hash)) => {
                info!("Model loaded: {} (hash {})", path.display(), hash);
                slot.install(artifact, Some(hash));
            }
            Err(err) => {
                warn!("Model not loaded ({}); predictions unavailable", err);
            }
        }
        slot
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn current(&self) -> Option<Arc<ModelArtifact>> {
        self.current.read().as_ref().map(|a| Arc::clone(&a.artifact))
    }

    /// Digest of the active artifact, as recorded when it was installed
    pub fn fingerprint(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|a| a.hash.clone())
    }

    /// Active artifact and its digest, read under one lock
    pub fn snapshot(&self) -> Option<(Arc<ModelArtifact>, Option<String>)> {
        self.current
            .read()
            .as_ref()
            .map(|a| (Arc::clone(&a.artifact), a.hash.clone()))
    }

    /// Replace the active artifact, returning the previous one
    pub fn swap(&self, artifact: ModelArtifact) -> Option<Arc<ModelArtifact>> {
        let hash = artifact.hash_hex().ok();
        self.install(artifact, hash)
    }

    fn install(&self, artifact: ModelArtifact, hash: Option<String>) -> Option<Arc<ModelArtifact>> {
        let next = Active {
            artifact: Arc::new(artifact),
            hash,
        };
        self.current.write().replace(next).map(|prev| prev.artifact)
    }

    /// Load a new artifact and swap it in; on failure the current one stays active
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let (artifact, hash) = ModelArtifact::load_verified(path.as_ref())?;
        info!("Model reloaded from {} (hash {})", path.as_ref().display(), hash);
        self.install(artifact, Some(hash));
        Ok(())
    }

    /// Inference service over the current snapshot
    pub fn service(&self) -> Result<InferenceService> {
        self.current()
            .map(InferenceService::new)
            .ok_or_else(|| FitCoreError::ModelUnavailable("no model artifact loaded".to_string()))
    }
}
