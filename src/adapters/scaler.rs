//! Fitted numeric scalers.
//!
//! Zero-variance columns are handled the way scikit-learn handles them: a
//! zero scale (or zero range) is replaced by 1 so the column passes through
//! centered instead of dividing by zero.

use serde::Deserialize;

use crate::ports::{check_width, FeatureScaler, ModelError};

fn check_finite(name: &str, values: &[f64]) -> Result<(), String> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(format!("non-finite {name} at index {i}")),
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
struct StandardScalerParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// `x' = (x - mean) / scale`
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "StandardScalerParams")]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// # Errors
    /// Returns a description of the problem on empty, mismatched or
    /// non-finite parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        if mean.is_empty() {
            return Err("standard scaler has no features".into());
        }
        if mean.len() != scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            ));
        }
        check_finite("mean", &mean)?;
        check_finite("scale", &scale)?;

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }
}

impl TryFrom<StandardScalerParams> for StandardScaler {
    type Error = String;

    fn try_from(params: StandardScalerParams) -> Result<Self, Self::Error> {
        Self::new(params.mean, params.scale)
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_width("scaler", self.mean.len(), row)?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

#[derive(Debug, Deserialize)]
struct MinMaxScalerParams {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    feature_range: [f64; 2],
}

/// Rescales each column from `[data_min, data_max]` onto `feature_range`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "MinMaxScalerParams")]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_range: Vec<f64>,
    feature_range: [f64; 2],
}

impl MinMaxScaler {
    /// # Errors
    /// Returns a description of the problem on empty, mismatched, non-finite
    /// or inverted parameters.
    pub fn new(
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        feature_range: [f64; 2],
    ) -> Result<Self, String> {
        if data_min.is_empty() {
            return Err("min-max scaler has no features".into());
        }
        if data_min.len() != data_max.len() {
            return Err(format!(
                "data_min has {} entries but data_max has {}",
                data_min.len(),
                data_max.len()
            ));
        }
        check_finite("data_min", &data_min)?;
        check_finite("data_max", &data_max)?;
        check_finite("feature_range", &feature_range)?;
        if feature_range[0] >= feature_range[1] {
            return Err(format!("invalid feature_range {feature_range:?}"));
        }

        let mut data_range = Vec::with_capacity(data_min.len());
        for (i, (lo, hi)) in data_min.iter().zip(&data_max).enumerate() {
            if hi < lo {
                return Err(format!("data_max < data_min at index {i}"));
            }
            let range = hi - lo;
            data_range.push(if range == 0.0 { 1.0 } else { range });
        }

        Ok(Self {
            data_min,
            data_range,
            feature_range,
        })
    }
}

impl TryFrom<MinMaxScalerParams> for MinMaxScaler {
    type Error = String;

    fn try_from(params: MinMaxScalerParams) -> Result<Self, Self::Error> {
        Self::new(params.data_min, params.data_max, params.feature_range)
    }
}

impl FeatureScaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_width("scaler", self.data_min.len(), row)?;
        let [lo, hi] = self.feature_range;
        Ok(row
            .iter()
            .zip(self.data_min.iter().zip(&self.data_range))
            .map(|(x, (min, range))| (x - min) / range * (hi - lo) + lo)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler::new(vec![10.0, 0.0], vec![2.0, 0.0]).expect("valid");
        let out = scaler.transform(&[14.0, 3.0]).expect("transform");
        assert!((out[0] - 2.0).abs() < 1e-12);
        // Zero scale passes the centered value through.
        assert!((out[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_scaler_rejects_bad_params() {
        assert!(StandardScaler::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(StandardScaler::new(vec![], vec![]).is_err());
        assert!(StandardScaler::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_min_max_scaler() {
        let json = r#"{ "data_min": [0.0, 5.0], "data_max": [10.0, 5.0] }"#;
        let scaler: MinMaxScaler = serde_json::from_str(json).expect("parse");
        let out = scaler.transform(&[2.5, 6.0]).expect("transform");
        assert!((out[0] - 0.25).abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);

        let ranged = MinMaxScaler::new(vec![0.0], vec![4.0], [-1.0, 1.0]).expect("valid");
        let out = ranged.transform(&[3.0]).expect("transform");
        assert!((out[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_scaler_rejects_inverted_bounds() {
        assert!(MinMaxScaler::new(vec![5.0], vec![1.0], [0.0, 1.0]).is_err());
        assert!(MinMaxScaler::new(vec![0.0], vec![1.0], [1.0, 0.0]).is_err());
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).expect("valid");
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ModelError::DimensionMismatch {
                component: "scaler",
                expected: 3,
                got: 1
            })
        ));
    }
}
