//! Domain layer: Core business types and logic.
//!
//! Pure types and pure functions: patient attributes, engineered features and
//! the decision policy. Nothing here performs I/O or touches the model bundle.

mod decision;
mod features;
mod patient;

pub use decision::{
    Confidence, EnrollmentLabel, PredictionResult, ENROLLMENT_THRESHOLD,
    HIGH_CONFIDENCE_THRESHOLD,
};
pub use features::{
    AgeGroup, BmiCategory, EngineeredFeatures, ENGINEERED_CATEGORICAL_FEATURES,
    ENGINEERED_NUMERIC_FEATURES,
};
pub use patient::{KeyFactors, PatientAttributes, RAW_CATEGORICAL_FEATURES, RAW_NUMERIC_FEATURES};
