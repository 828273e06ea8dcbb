//! Model artifact: encoder state plus ensemble, persisted as one unit
//!
//! The artifact is written as canonical JSON with a BLAKE3 digest beside it
//! (`fit_model.json` + `fit_model.hash`). Retraining replaces both files;
//! there is no partial update.

use crate::errors::{FitCoreError, Result};
use crate::features::{FeatureEncoder, FEATURE_SCHEMA};
use crate::gbdt::Ensemble;
use crate::serde_canon::{blake3_hex, to_canonical_json};
use crate::types::FitLabel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Artifact format version; bump on any layout or schema change
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Default artifact file name inside the model directory
pub const MODEL_FILE_NAME: &str = "fit_model.json";

/// Digest file name written next to the artifact
pub const HASH_FILE_NAME: &str = "fit_model.hash";

/// Reads attempted before a digest mismatch is reported
const LOAD_ATTEMPTS: u32 = 10;

/// Pause between reads while a replace may be in progress
const LOAD_RETRY_DELAY: Duration = Duration::from_millis(25);

/// How the artifact was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub sample_count: usize,
    pub anchor_count: usize,
    pub seed: u64,
    pub trees_per_class: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Named input fields the encoder consumes
    pub schema: Vec<String>,
    /// Class names in ensemble order
    pub classes: Vec<String>,
    /// Version of the rule table the corpus was generated from
    pub rules_version: u32,
    pub encoder: FeatureEncoder,
    pub ensemble: Ensemble,
    pub training: TrainingSummary,
}

impl ModelArtifact {
    pub fn new(
        encoder: FeatureEncoder,
        ensemble: Ensemble,
        rules_version: u32,
        training: TrainingSummary,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            schema: FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect(),
            classes: FitLabel::ALL.iter().map(|l| l.as_str().to_string()).collect(),
            rules_version,
            encoder,
            ensemble,
            training,
        }
    }

    /// Check the artifact matches this build's schema and is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(FitCoreError::InvalidArtifact(format!(
                "unsupported format version {}, expected {}",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let expected: Vec<String> = FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect();
        if self.schema != expected {
            return Err(FitCoreError::SchemaMismatch {
                expected,
                found: self.schema.clone(),
            });
        }

        let classes: Vec<String> = FitLabel::ALL.iter().map(|l| l.as_str().to_string()).collect();
        if self.classes != classes {
            return Err(FitCoreError::InvalidArtifact(format!(
                "class order {:?} does not match {:?}",
                self.classes, classes
            )));
        }

        self.encoder.validate()?;

        if self.encoder.width() != self.ensemble.feature_count {
            return Err(FitCoreError::InvalidArtifact(format!(
                "encoder produces {} features but ensemble expects {}",
                self.encoder.width(),
                self.ensemble.feature_count
            )));
        }
        if self.ensemble.class_count() != FitLabel::COUNT {
            return Err(FitCoreError::InvalidArtifact(format!(
                "ensemble has {} classes, expected {}",
                self.ensemble.class_count(),
                FitLabel::COUNT
            )));
        }
        self.ensemble
            .validate()
            .map_err(FitCoreError::InvalidArtifact)?;

        Ok(())
    }

    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(to_canonical_json(self)?)
    }

    /// BLAKE3 digest of the canonical JSON, hex encoded
    pub fn hash_hex(&self) -> Result<String> {
        Ok(blake3_hex(&self.to_canonical_json()?))
    }

    /// Write the artifact and its digest into `dir`, returning both paths
    ///
    /// Each file is written to a temporary and renamed, model first, so
    /// readers never see a half-written file.
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let json = self.to_canonical_json()?;
        let hash = blake3_hex(&json);

        let model_path = dir.join(MODEL_FILE_NAME);
        let hash_path = dir.join(HASH_FILE_NAME);

        write_replace(&model_path, json.as_bytes())?;
        write_replace(&hash_path, hash.as_bytes())?;

        info!(
            "Saved model artifact to {} (hash {})",
            model_path.display(),
            hash
        );
        Ok((model_path, hash_path))
    }

    /// Move an artifact saved in `staging` into `dir` and remove `staging`
    ///
    /// Both directories must be on the same filesystem.
    pub fn promote<P: AsRef<Path>, Q: AsRef<Path>>(staging: P, dir: Q) -> Result<(PathBuf, PathBuf)> {
        let (staging, dir) = (staging.as_ref(), dir.as_ref());
        fs::create_dir_all(dir)?;

        let model_path = dir.join(MODEL_FILE_NAME);
        let hash_path = dir.join(HASH_FILE_NAME);
        fs::rename(staging.join(MODEL_FILE_NAME), &model_path)?;
        fs::rename(staging.join(HASH_FILE_NAME), &hash_path)?;
        fs::remove_dir(staging)?;

        info!("Promoted model artifact to {}", model_path.display());
        Ok((model_path, hash_path))
    }

    /// Load and validate an artifact
    ///
    /// A missing file is reported as [`FitCoreError::ModelUnavailable`]. When
    /// a `.hash` file sits next to the artifact, the digest must match.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_verified(path).map(|(artifact, _)| artifact)
    }

    /// Load and validate an artifact, returning it with its digest
    ///
    /// A digest mismatch is re-read a few times before it is reported, since
    /// a concurrent [`save_to_dir`](Self::save_to_dir) briefly pairs the new
    /// model with the old digest.
    pub fn load_verified<P: AsRef<Path>>(path: P) -> Result<(Self, String)> {
        let path = path.as_ref();
        let mut attempt = 1;
        loop {
            match Self::read_pair(path)? {
                Ok(loaded) => return Ok(loaded),
                Err((expected, actual)) if attempt >= LOAD_ATTEMPTS => {
                    return Err(FitCoreError::InvalidArtifact(format!(
                        "digest mismatch for {}: file says {}, content hashes to {}",
                        path.display(),
                        expected,
                        actual
                    )));
                }
                Err((expected, actual)) => {
                    warn!(
                        "Digest mismatch for {} (attempt {}/{}): {} != {}",
                        path.display(),
                        attempt,
                        LOAD_ATTEMPTS,
                        expected,
                        actual
                    );
                    attempt += 1;
                    thread::sleep(LOAD_RETRY_DELAY);
                }
            }
        }
    }

    /// One read of the artifact and its digest file; the inner error is
    /// `(recorded, computed)` on a digest mismatch
    fn read_pair(path: &Path) -> Result<std::result::Result<(Self, String), (String, String)>> {
        if !path.exists() {
            return Err(FitCoreError::ModelUnavailable(format!(
                "artifact not found at {}",
                path.display()
            )));
        }

        let json = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        artifact.validate()?;
        let actual = artifact.hash_hex()?;

        let hash_path = path.with_extension("hash");
        if hash_path.exists() {
            let expected = fs::read_to_string(&hash_path)?.trim().to_string();
            if expected != actual {
                return Ok(Err((expected, actual)));
            }
            debug!("Artifact digest verified: {}", actual);
        }

        Ok(Ok((artifact, actual)))
    }
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
