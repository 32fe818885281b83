//! The trained model bundle: classifier, scaler, encoders and column order.
//!
//! A bundle is validated once at construction and is immutable afterwards.
//! Shared across threads behind an `Arc`, it needs no locking.

use std::collections::BTreeMap;

use crate::adapters::BundleError;
use crate::domain::{
    EngineeredFeatures, PatientAttributes, ENGINEERED_CATEGORICAL_FEATURES,
    ENGINEERED_NUMERIC_FEATURES, RAW_CATEGORICAL_FEATURES, RAW_NUMERIC_FEATURES,
};
use crate::ports::{CategoryEncoder, Classifier, FeatureScaler, ModelError};

/// Code substituted when a categorical value cannot be encoded.
///
/// This makes an unseen category indistinguishable from the encoder's first
/// class. Existing models depend on it; do not change without retraining.
pub const ENCODER_FALLBACK_CODE: usize = 0;

struct FittedEncoder {
    /// Categorical feature the encoder reads, e.g. `gender`
    source: String,
    /// Column the encoded value is published under, e.g. `gender_encoded`
    column: String,
    encoder: Box<dyn CategoryEncoder>,
}

/// Encoded categoricals for one patient, keyed by `<feature>_encoded`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures<'a> {
    values: Vec<(&'a str, f64)>,
}

impl EncodedFeatures<'_> {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find_map(|(name, value)| (*name == column).then_some(*value))
    }
}

/// Immutable set of trained artifacts required to run inference.
pub struct ModelBundle {
    classifier: Box<dyn Classifier>,
    scaler: Box<dyn FeatureScaler>,
    encoders: Vec<FittedEncoder>,
    feature_columns: Vec<String>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("classifier", &self.classifier.kind())
            .field("encoders", &self.encoders.iter().map(|e| &e.source).collect::<Vec<_>>())
            .field("feature_columns", &self.feature_columns)
            .finish_non_exhaustive()
    }
}

fn is_categorical_source(name: &str) -> bool {
    RAW_CATEGORICAL_FEATURES.contains(&name) || ENGINEERED_CATEGORICAL_FEATURES.contains(&name)
}

impl ModelBundle {
    /// Assemble and validate a bundle.
    ///
    /// # Errors
    /// Returns `BundleError::UnresolvableFeature` if a feature column is not a
    /// raw numeric, engineered numeric or `<encoder>_encoded` name, and
    /// `BundleError::DimensionMismatch` if the scaler or classifier width
    /// differs from the number of feature columns.
    pub fn new(
        classifier: Box<dyn Classifier>,
        scaler: Box<dyn FeatureScaler>,
        encoders: BTreeMap<String, Box<dyn CategoryEncoder>>,
        feature_columns: Vec<String>,
    ) -> Result<Self, BundleError> {
        if feature_columns.is_empty() {
            return Err(BundleError::EmptyFeatureColumns);
        }

        let encoders: Vec<FittedEncoder> = encoders
            .into_iter()
            .map(|(source, encoder)| {
                if !is_categorical_source(&source) {
                    // Kept: lookups for it fall back to the default code.
                    tracing::warn!(
                        "Encoder {source:?} does not name a known categorical feature; it will always encode as {ENCODER_FALLBACK_CODE}"
                    );
                }
                FittedEncoder {
                    column: format!("{source}_encoded"),
                    source,
                    encoder,
                }
            })
            .collect();

        for column in &feature_columns {
            let resolvable = RAW_NUMERIC_FEATURES.contains(&column.as_str())
                || ENGINEERED_NUMERIC_FEATURES.contains(&column.as_str())
                || encoders.iter().any(|e| &e.column == column);
            if !resolvable {
                return Err(BundleError::UnresolvableFeature(column.clone()));
            }
        }

        let expected = feature_columns.len();
        if scaler.n_features() != expected {
            return Err(BundleError::DimensionMismatch {
                component: "scaler",
                expected,
                got: scaler.n_features(),
            });
        }
        if classifier.n_features() != expected {
            return Err(BundleError::DimensionMismatch {
                component: "classifier",
                expected,
                got: classifier.n_features(),
            });
        }

        Ok(Self {
            classifier,
            scaler,
            encoders,
            feature_columns,
        })
    }

    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    #[must_use]
    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    #[must_use]
    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }

    /// Encode every categorical feature known to the bundle.
    ///
    /// Never fails: unseen labels, unbinned engineered categories and
    /// encoders naming unknown features all encode as
    /// [`ENCODER_FALLBACK_CODE`].
    #[must_use]
    pub fn encode<'a>(
        &'a self,
        attrs: &PatientAttributes,
        engineered: &EngineeredFeatures,
    ) -> EncodedFeatures<'a> {
        let values = self
            .encoders
            .iter()
            .map(|fitted| {
                let label = attrs
                    .categorical(&fitted.source)
                    .or_else(|| engineered.categorical(&fitted.source));
                let code = match label.and_then(|l| fitted.encoder.encode(l)) {
                    Some(code) => code,
                    None => {
                        tracing::debug!(
                            "No code for {}; using fallback {ENCODER_FALLBACK_CODE}",
                            fitted.source
                        );
                        ENCODER_FALLBACK_CODE
                    }
                };
                (fitted.column.as_str(), code as f64)
            })
            .collect();
        EncodedFeatures { values }
    }

    /// Select the feature columns, in training order, into one row.
    ///
    /// # Errors
    /// Returns `BundleError::UnresolvableFeature` if a column cannot be found.
    /// Construction-time validation makes this unreachable for bundles built
    /// through [`ModelBundle::new`]; it is never zero-filled.
    pub fn assemble(
        &self,
        attrs: &PatientAttributes,
        engineered: &EngineeredFeatures,
        encoded: &EncodedFeatures<'_>,
    ) -> Result<Vec<f64>, BundleError> {
        self.feature_columns
            .iter()
            .map(|column| {
                attrs
                    .numeric(column)
                    .or_else(|| engineered.numeric(column))
                    .or_else(|| encoded.get(column))
                    .ok_or_else(|| BundleError::UnresolvableFeature(column.clone()))
            })
            .collect()
    }

    /// Apply the fitted scaler.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a row of the wrong width.
    pub fn scale(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.scaler.transform(row)
    }

    /// Probability of enrollment for a scaled row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a row of the wrong width.
    pub fn predict_proba(&self, scaled: &[f64]) -> Result<f64, ModelError> {
        self.classifier.predict_proba(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::label_encoder::LabelEncoder;
    use crate::adapters::linear::LogisticRegression;
    use crate::adapters::scaler::StandardScaler;
    use crate::test_support::sample_patient;

    fn encoders(names: &[(&str, &[&str])]) -> BTreeMap<String, Box<dyn CategoryEncoder>> {
        names
            .iter()
            .map(|(name, classes)| {
                let enc = LabelEncoder::new(classes.iter().map(|c| (*c).to_string()).collect())
                    .expect("valid encoder");
                ((*name).to_string(), Box::new(enc) as Box<dyn CategoryEncoder>)
            })
            .collect()
    }

    fn bundle(columns: &[&str]) -> Result<ModelBundle, BundleError> {
        let n = columns.len();
        ModelBundle::new(
            Box::new(LogisticRegression::new(vec![1.0; n], 0.0).expect("valid")),
            Box::new(StandardScaler::new(vec![0.0; n], vec![1.0; n]).expect("valid")),
            encoders(&[
                ("gender", &["F", "M"]),
                ("site_location", &["SiteA", "SiteB"]),
                ("age_group", &["Elderly", "Middle", "Senior", "Young"]),
            ]),
            columns.iter().map(|c| (*c).to_string()).collect(),
        )
    }

    #[test]
    fn test_assembles_in_column_order() {
        let bundle = bundle(&[
            "accessibility_score",
            "age",
            "gender_encoded",
            "age_group_encoded",
            "previous_trials",
        ])
        .expect("valid bundle");

        let patient = sample_patient();
        let engineered = EngineeredFeatures::derive(&patient);
        let encoded = bundle.encode(&patient, &engineered);
        let row = bundle.assemble(&patient, &engineered, &encoded).expect("assemble");

        assert_eq!(row, vec![90.0, 45.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_unseen_category_encodes_to_zero() {
        let bundle = bundle(&["site_location_encoded"]).expect("valid bundle");
        let patient = PatientAttributes {
            site_location: "SiteZ".into(),
            ..sample_patient()
        };
        let engineered = EngineeredFeatures::derive(&patient);
        let encoded = bundle.encode(&patient, &engineered);
        assert_eq!(encoded.get("site_location_encoded"), Some(0.0));

        let known = PatientAttributes {
            site_location: "SiteB".into(),
            ..sample_patient()
        };
        let encoded = bundle.encode(&known, &EngineeredFeatures::derive(&known));
        assert_eq!(encoded.get("site_location_encoded"), Some(1.0));
    }

    #[test]
    fn test_unbinned_category_encodes_to_zero() {
        let bundle = bundle(&["age_group_encoded"]).expect("valid bundle");
        let patient = PatientAttributes {
            age: 130.0,
            ..sample_patient()
        };
        let engineered = EngineeredFeatures::derive(&patient);
        assert_eq!(engineered.age_group, None);
        let encoded = bundle.encode(&patient, &engineered);
        assert_eq!(encoded.get("age_group_encoded"), Some(0.0));
    }

    #[test]
    fn test_encoder_for_unknown_feature_falls_back() {
        let n = 1;
        let bundle = ModelBundle::new(
            Box::new(LogisticRegression::new(vec![1.0; n], 0.0).expect("valid")),
            Box::new(StandardScaler::new(vec![0.0; n], vec![1.0; n]).expect("valid")),
            encoders(&[("blood_type", &["A", "B"])]),
            vec!["blood_type_encoded".into()],
        )
        .expect("unknown encoder source is tolerated");

        let patient = sample_patient();
        let encoded = bundle.encode(&patient, &EngineeredFeatures::derive(&patient));
        assert_eq!(encoded.get("blood_type_encoded"), Some(0.0));
    }

    #[test]
    fn test_rejects_unresolvable_columns() {
        // Raw categorical strings are not numeric features.
        assert!(matches!(
            bundle(&["age", "gender"]),
            Err(BundleError::UnresolvableFeature(c)) if c == "gender"
        ));
        assert!(matches!(
            bundle(&["insurance_type_encoded"]),
            Err(BundleError::UnresolvableFeature(_))
        ));
        assert!(matches!(bundle(&[]), Err(BundleError::EmptyFeatureColumns)));
    }

    #[test]
    fn test_rejects_scaler_width_mismatch() {
        let err = ModelBundle::new(
            Box::new(LogisticRegression::new(vec![1.0; 2], 0.0).expect("valid")),
            Box::new(StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).expect("valid")),
            BTreeMap::new(),
            vec!["age".into(), "bmi".into()],
        )
        .expect_err("should fail");
        assert!(matches!(
            err,
            BundleError::DimensionMismatch {
                component: "scaler",
                expected: 2,
                got: 3
            }
        ));
    }
}
