//! # Enrollwise
//!
//! Clinical trial enrollment predictor.
//!
//! Given a candidate's demographic, clinical and logistical attributes, the
//! service estimates the probability that the candidate will enroll, maps it
//! to a confidence tier and returns a recruitment recommendation.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Patient attributes, engineered features, decision policy
//! - `ports`: Classifier and preprocessing traits
//! - `adapters`: Concrete models, scalers, encoders and the bundle loader
//! - `application`: The model bundle and the prediction pipeline
//! - `api`: HTTP surface
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use application::{ModelBundle, PredictionService};
pub use domain::{PatientAttributes, PredictionResult};

/// Result type for Enrollwise operations
pub type Result<T> = std::result::Result<T, EnrollwiseError>;

/// Main error type for Enrollwise
#[derive(Debug, thiserror::Error)]
pub enum EnrollwiseError {
    #[error("Model bundle error: {0}")]
    Bundle(#[from] adapters::BundleError),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Invalid patient data: {0}")]
    Validation(String),
}
