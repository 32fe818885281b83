//! Preprocessing ports: numeric scaling and categorical encoding.

use super::classifier::ModelError;

/// A fitted numeric transform. Parameters never change after loading.
pub trait FeatureScaler: Send + Sync {
    fn n_features(&self) -> usize;

    /// Transform one row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a row of the wrong width.
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// A fitted label vocabulary mapping category labels to integer codes.
pub trait CategoryEncoder: Send + Sync {
    /// Code for `label`, or `None` when the label was never seen in training.
    fn encode(&self, label: &str) -> Option<usize>;
}
