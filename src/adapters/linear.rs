//! Logistic regression classifier.
//!
//! Parameters come from the `logistic_regression` variant of
//! `enrollment_model.json`:
//!
//! ```json
//! { "kind": "logistic_regression", "coefficients": [0.4, -1.2], "intercept": 0.1 }
//! ```

use serde::Deserialize;

use crate::ports::{check_width, Classifier, ModelError};

#[derive(Debug, Deserialize)]
struct LogisticRegressionParams {
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Binary logistic regression: `p = sigmoid(w · x + b)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LogisticRegressionParams")]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    /// Build a model from fitted parameters.
    ///
    /// # Errors
    /// Returns a description of the problem if there are no coefficients or
    /// any parameter is non-finite.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, String> {
        if coefficients.is_empty() {
            return Err("logistic regression has no coefficients".into());
        }
        if let Some(i) = coefficients.iter().position(|w| !w.is_finite()) {
            return Err(format!("non-finite coefficient at index {i}"));
        }
        if !intercept.is_finite() {
            return Err(format!("non-finite intercept: {intercept}"));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    /// Linear score before the sigmoid.
    #[must_use]
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

impl TryFrom<LogisticRegressionParams> for LogisticRegression {
    type Error = String;

    fn try_from(params: LogisticRegressionParams) -> Result<Self, Self::Error> {
        Self::new(params.coefficients, params.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, ModelError> {
        check_width("classifier", self.coefficients.len(), row)?;
        Ok(sigmoid(self.decision_function(row)))
    }
}
