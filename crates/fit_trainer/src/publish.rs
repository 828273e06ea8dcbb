//! Staged publication of a trained artifact
//!
//! A new artifact is written to a staging directory inside the output
//! directory, reloaded from there and replayed through the rule-coverage
//! check. It replaces the published model only when the gate allows it.

use fitcheck_core::{InferenceService, ModelArtifact, HASH_FILE_NAME, MODEL_FILE_NAME};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::coverage::{check_coverage, CoverageCase, CoverageReport};
use crate::errors::TrainerError;

/// Staging directory name, created under the output directory
pub const STAGING_DIR_NAME: &str = ".staging";

/// Result of a publication attempt
#[derive(Debug)]
pub struct Publication {
    pub report: CoverageReport,
    /// Where the model now lives: the output directory when published,
    /// otherwise the staging directory
    pub model_path: PathBuf,
    pub hash_path: PathBuf,
    pub published: bool,
}

/// Stage `artifact`, check it against `cases` and promote it into `output`
///
/// With `strict` set, any failing case keeps the artifact in staging and the
/// previously published model untouched.
pub fn stage_and_publish(
    artifact: &ModelArtifact,
    output: &Path,
    cases: &[CoverageCase],
    strict: bool,
) -> Result<Publication, TrainerError> {
    let staging = output.join(STAGING_DIR_NAME);
    let (staged_model, staged_hash) = artifact.save_to_dir(&staging)?;

    // replay through the serving path, from the file just written
    let reloaded = ModelArtifact::load(&staged_model)?;
    let service = InferenceService::new(Arc::new(reloaded));
    let report = check_coverage(&service, cases)?;
    report.log();

    if strict && !report.is_clean() {
        warn!(
            "Rule coverage failed; candidate left at {}, published model unchanged",
            staged_model.display()
        );
        return Ok(Publication {
            report,
            model_path: staged_model,
            hash_path: staged_hash,
            published: false,
        });
    }

    let (model_path, hash_path) = ModelArtifact::promote(&staging, output)?;
    info!("Published {} and {}", MODEL_FILE_NAME, HASH_FILE_NAME);
    Ok(Publication {
        report,
        model_path,
        hash_path,
        published: true,
    })
}
