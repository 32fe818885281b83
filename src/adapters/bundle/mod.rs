//! Bundle adapter: loads the trained model bundle from a directory of JSON
//! artifacts.
//!
//! Expected layout:
//! - `enrollment_model.json`: classifier, tagged by `kind`
//!   (`logistic_regression` | `random_forest`)
//! - `scaler.json`: fitted scaler, tagged by `kind` (`standard` | `min_max`)
//! - `label_encoders.json`: `{ "<feature>": { "classes": [...] }, ... }`
//! - `feature_columns.json`: ordered list of feature names
//!
//! When a [`BundleVerifier`] is configured, every artifact must also be bound
//! by a signed manifest (see [`integrity`]).
//!
//! Every error produced here is a configuration error: a bundle that fails to
//! load must keep the service from starting.

pub mod integrity;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::forest::RandomForest;
use super::label_encoder::LabelEncoder;
use super::linear::LogisticRegression;
use super::scaler::{MinMaxScaler, StandardScaler};
use crate::application::ModelBundle;
use crate::ports::{CategoryEncoder, Classifier, FeatureScaler};

pub use integrity::{BundleManifest, BundleVerifier, MANIFEST_FILE, SIGNATURE_FILE};

pub const CLASSIFIER_FILE: &str = "enrollment_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";

/// The four artifacts that make up a bundle.
pub const ARTIFACT_FILES: [&str; 4] = [
    CLASSIFIER_FILE,
    SCALER_FILE,
    ENCODERS_FILE,
    FEATURE_COLUMNS_FILE,
];

/// Error type for bundle loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Missing bundle artifact {path:?}")]
    MissingArtifact { path: PathBuf },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {artifact}: {source}")]
    Malformed {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bundle declares no feature columns")]
    EmptyFeatureColumns,

    #[error("{component} expects {got} features but feature_columns lists {expected}")]
    DimensionMismatch {
        component: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Feature column {0:?} cannot be resolved from raw, engineered or encoded features")]
    UnresolvableFeature(String),

    #[error("Bundle integrity check failed: {0}")]
    Integrity(String),
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, BundleError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => BundleError::MissingArtifact {
            path: path.to_path_buf(),
        },
        _ => BundleError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ClassifierArtifact {
    fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            Self::LogisticRegression(m) => Box::new(m),
            Self::RandomForest(m) => Box::new(m),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl ScalerArtifact {
    fn into_scaler(self) -> Box<dyn FeatureScaler> {
        match self {
            Self::Standard(s) => Box::new(s),
            Self::MinMax(s) => Box::new(s),
        }
    }
}

/// Loads and validates a [`ModelBundle`] from a bundle directory.
#[derive(Debug, Clone)]
pub struct BundleLoader {
    dir: PathBuf,
    verifier: Option<BundleVerifier>,
}

impl BundleLoader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            verifier: None,
        }
    }

    /// Require a valid signed manifest covering every artifact.
    #[must_use]
    pub fn with_verifier(mut self, verifier: BundleVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every artifact and assemble the bundle.
    ///
    /// # Errors
    /// Returns a `BundleError` if any artifact is missing, malformed, fails
    /// integrity checks, or if the artifacts are inconsistent with each other.
    pub fn load(&self) -> Result<ModelBundle, BundleError> {
        let manifest = match &self.verifier {
            Some(verifier) => Some(verifier.verify_manifest(&self.dir)?),
            None => {
                tracing::warn!(
                    "Loading UNSIGNED model bundle from {:?}; configure a public key to enforce integrity",
                    self.dir
                );
                None
            }
        };
        let manifest = manifest.as_ref();

        let classifier: ClassifierArtifact = self.read_artifact(CLASSIFIER_FILE, manifest)?;
        let scaler: ScalerArtifact = self.read_artifact(SCALER_FILE, manifest)?;
        let encoders: BTreeMap<String, LabelEncoder> =
            self.read_artifact(ENCODERS_FILE, manifest)?;
        let feature_columns: Vec<String> = self.read_artifact(FEATURE_COLUMNS_FILE, manifest)?;

        let encoders = encoders
            .into_iter()
            .map(|(name, enc)| (name, Box::new(enc) as Box<dyn CategoryEncoder>))
            .collect();

        let bundle = ModelBundle::new(
            classifier.into_classifier(),
            scaler.into_scaler(),
            encoders,
            feature_columns,
        )?;

        tracing::info!(
            "Loaded model bundle from {:?} (classifier={}, n_features={}, encoders={})",
            self.dir,
            bundle.classifier_kind(),
            bundle.feature_columns().len(),
            bundle.encoder_count()
        );
        Ok(bundle)
    }

    fn read_artifact<T: DeserializeOwned>(
        &self,
        artifact: &'static str,
        manifest: Option<&BundleManifest>,
    ) -> Result<T, BundleError> {
        let bytes = read_file(&self.dir.join(artifact))?;
        if let Some(manifest) = manifest {
            manifest.check(artifact, &bytes)?;
        }
        serde_json::from_slice(&bytes).map_err(|source| BundleError::Malformed { artifact, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{demo_bundle_dir, sample_patient};
    use ed25519_dalek::{Signer, SigningKey};
    use tempfile::{tempdir, TempDir};

    fn copy_demo_bundle() -> TempDir {
        let dir = tempdir().expect("tempdir");
        for name in ARTIFACT_FILES {
            std::fs::copy(demo_bundle_dir().join(name), dir.path().join(name))
                .expect("copy artifact");
        }
        dir
    }

    fn sign(dir: &Path, key: &SigningKey) {
        let manifest = BundleManifest::from_artifacts(dir, &ARTIFACT_FILES).expect("manifest");
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize");
        std::fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        std::fs::write(dir.join(SIGNATURE_FILE), key.sign(&bytes).to_bytes()).expect("write sig");
    }

    #[test]
    fn test_loads_demo_bundle() {
        let bundle = BundleLoader::new(demo_bundle_dir()).load().expect("demo bundle loads");
        assert_eq!(bundle.classifier_kind(), "logistic_regression");
        assert_eq!(bundle.feature_columns().len(), 20);
        assert_eq!(bundle.encoder_count(), 9);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = copy_demo_bundle();
        std::fs::remove_file(dir.path().join(SCALER_FILE)).expect("remove");
        let err = BundleLoader::new(dir.path()).load().expect_err("should fail");
        assert!(matches!(err, BundleError::MissingArtifact { .. }));
    }

    #[test]
    fn test_malformed_artifact() {
        let dir = copy_demo_bundle();
        std::fs::write(dir.path().join(CLASSIFIER_FILE), r#"{ "kind": "svm" }"#).expect("write");
        let err = BundleLoader::new(dir.path()).load().expect_err("should fail");
        assert!(matches!(
            err,
            BundleError::Malformed {
                artifact: CLASSIFIER_FILE,
                ..
            }
        ));
    }

    #[test]
    fn test_unresolvable_feature_column_is_fatal() {
        let dir = copy_demo_bundle();
        let path = dir.path().join(FEATURE_COLUMNS_FILE);
        let mut columns: Vec<String> =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("parse");
        columns[0] = "shoe_size".into();
        std::fs::write(&path, serde_json::to_vec(&columns).expect("serialize")).expect("write");

        let err = BundleLoader::new(dir.path()).load().expect_err("should fail");
        assert!(matches!(err, BundleError::UnresolvableFeature(name) if name == "shoe_size"));
    }

    #[test]
    fn test_random_forest_with_min_max_scaler() {
        let dir = tempdir().expect("tempdir");
        let write = |name: &str, value: serde_json::Value| {
            std::fs::write(dir.path().join(name), value.to_string()).expect("write");
        };
        write(
            CLASSIFIER_FILE,
            serde_json::json!({
                "kind": "random_forest",
                "n_features": 2,
                "trees": [{ "nodes": [
                    { "feature": 1, "threshold": 0.5, "left": 1, "right": 2, "value": [5.0, 5.0] },
                    { "left": -1, "right": -1, "value": [4.0, 1.0] },
                    { "left": -1, "right": -1, "value": [1.0, 4.0] }
                ]}]
            }),
        );
        write(
            SCALER_FILE,
            serde_json::json!({
                "kind": "min_max",
                "data_min": [0.0, 0.0],
                "data_max": [100.0, 1.0]
            }),
        );
        write(
            ENCODERS_FILE,
            serde_json::json!({ "trial_phase": { "classes": ["Phase1", "Phase2"] } }),
        );
        write(
            FEATURE_COLUMNS_FILE,
            serde_json::json!(["age", "trial_phase_encoded"]),
        );

        let bundle = BundleLoader::new(dir.path()).load().expect("loads");
        assert_eq!(bundle.classifier_kind(), "random_forest");

        // Phase2 encodes to 1, scales to 1.0, and routes right: 4 / 5.
        let service = crate::application::PredictionService::new(std::sync::Arc::new(bundle));
        let result = service.predict(&sample_patient()).expect("predict");
        assert!((result.probability - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_width_must_match_columns() {
        let dir = copy_demo_bundle();
        std::fs::write(
            dir.path().join(CLASSIFIER_FILE),
            r#"{ "kind": "logistic_regression", "coefficients": [1.0, 2.0], "intercept": 0.0 }"#,
        )
        .expect("write");
        let err = BundleLoader::new(dir.path()).load().expect_err("should fail");
        assert!(matches!(
            err,
            BundleError::DimensionMismatch {
                component: "classifier",
                expected: 20,
                got: 2
            }
        ));
    }

    #[test]
    fn test_signed_bundle_roundtrip() {
        let dir = copy_demo_bundle();
        let key = SigningKey::from_bytes(&[42u8; 32]);
        sign(dir.path(), &key);

        let loader =
            BundleLoader::new(dir.path()).with_verifier(BundleVerifier::new(key.verifying_key()));
        assert!(loader.load().is_ok());

        // Tampering with an artifact after signing is caught.
        std::fs::write(dir.path().join(FEATURE_COLUMNS_FILE), r#"["age"]"#).expect("write");
        assert!(matches!(loader.load(), Err(BundleError::Integrity(_))));
    }

    #[test]
    fn test_verifier_requires_signature() {
        let dir = copy_demo_bundle();
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let loader =
            BundleLoader::new(dir.path()).with_verifier(BundleVerifier::new(key.verifying_key()));
        assert!(matches!(loader.load(), Err(BundleError::Integrity(_))));
    }
}
