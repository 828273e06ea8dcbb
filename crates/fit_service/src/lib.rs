//! FitCheck Service - the prediction surface around the fit core
//!
//! Owns service configuration, lenient JSON request decoding, response
//! shaping (label, rounded percentages, fit confidence, product image) and
//! atomic model reload. Transport (HTTP, auth, history) lives elsewhere.

pub mod config;
pub mod errors;
pub mod imagery;
pub mod service;

pub use config::ServiceConfig;
pub use errors::{ErrorBody, Result, ServiceError};
pub use imagery::{ImageryLookup, StaticImagery};
pub use service::{FitService, PredictResponse, ServiceStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
