//! Ports layer: Trait definitions for the trained model bundle.
//!
//! These traits are the boundary between the prediction pipeline and the
//! concrete artifact formats implemented in `adapters`.

mod classifier;
mod preprocess;

pub(crate) use classifier::check_width;
pub use classifier::{Classifier, ModelError};
pub use preprocess::{CategoryEncoder, FeatureScaler};
