//! Error types for the fit core

use thiserror::Error;

/// Errors raised by rule configuration, artifact handling and inference
#[derive(Error, Debug)]
pub enum FitCoreError {
    /// No artifact is loaded or the artifact file does not exist
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Artifact was trained against a different feature schema
    #[error("Feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Artifact content is structurally invalid
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Rule table or encoder configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Inference failed on a loaded artifact
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for fit core operations
pub type Result<T> = std::result::Result<T, FitCoreError>;
