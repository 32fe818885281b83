//! Classifier port: Trait for probabilistic binary classifiers.
//!
//! The classifier is an opaque oracle: a scaled feature row goes in, the
//! probability of the positive ("Enrolled") class comes out.

/// Error type for per-call model evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{component} expected {expected} features, got {got}")]
    DimensionMismatch {
        component: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0} produced a non-finite value")]
    NonFinite(&'static str),
}

/// Trait for trained binary classifiers.
pub trait Classifier: Send + Sync {
    /// Short identifier of the model family, used in logs and health output.
    fn kind(&self) -> &'static str;

    /// Number of features the classifier was trained on.
    fn n_features(&self) -> usize;

    /// Probability of class 1 for a single scaled row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `row.len() != n_features()`.
    fn predict_proba(&self, row: &[f64]) -> Result<f64, ModelError>;
}

/// Fail with a dimension mismatch unless `row` has `expected` entries.
pub(crate) fn check_width(
    component: &'static str,
    expected: usize,
    row: &[f64],
) -> Result<(), ModelError> {
    if row.len() == expected {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            component,
            expected,
            got: row.len(),
        })
    }
}
