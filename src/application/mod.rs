//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the enrollment prediction pipeline.

mod bundle;
mod prediction;

pub use bundle::{EncodedFeatures, ModelBundle, ENCODER_FALLBACK_CODE};
pub use prediction::PredictionService;
