use fitcheck_core::FitCoreError;
use thiserror::Error;

/// Errors returned by corpus generation and training.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Core(#[from] FitCoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
