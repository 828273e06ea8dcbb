//! Service error types

use fitcheck_core::FitCoreError;
use serde::Serialize;
use thiserror::Error;

/// Prediction service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Prediction unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FitCoreError> for ServiceError {
    fn from(err: FitCoreError) -> Self {
        match err {
            FitCoreError::ModelUnavailable(msg) => ServiceError::ModelUnavailable(msg),
            FitCoreError::InvalidConfig(msg) => ServiceError::ConfigError(msg),
            FitCoreError::Io(e) => ServiceError::Io(e),
            other => ServiceError::PredictionFailed(other.to_string()),
        }
    }
}

/// Error payload handed to the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub msg: String,
}

impl ServiceError {
    /// HTTP-style status code a transport should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::ModelUnavailable(_) => 503,
            _ => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            msg: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
