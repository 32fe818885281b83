//! Prediction service: runs the enrollment pipeline for one patient.
//!
//! raw attributes → engineered features → encoded categoricals →
//! ordered vector → scaled vector → probability → decision.
//!
//! Each call reads the shared bundle and nothing else, so concurrent calls
//! need no coordination.

use std::sync::Arc;

use crate::domain::{EngineeredFeatures, PatientAttributes, PredictionResult};
use crate::ports::ModelError;

use super::ModelBundle;

/// Service for running enrollment predictions against a loaded bundle.
#[derive(Debug, Clone)]
pub struct PredictionService {
    bundle: Arc<ModelBundle>,
}

impl PredictionService {
    /// Create a service over an already validated bundle.
    #[must_use]
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    #[must_use]
    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predict enrollment for one patient.
    ///
    /// # Errors
    /// Returns an error if the bundle is inconsistent with the feature set or
    /// the classifier yields a non-finite probability. Unseen categories are
    /// not errors.
    pub fn predict(&self, attrs: &PatientAttributes) -> crate::Result<PredictionResult> {
        tracing::debug!("Step 1: Deriving engineered features...");
        let engineered = EngineeredFeatures::derive(attrs);

        tracing::debug!("Step 2: Encoding categorical features...");
        let encoded = self.bundle.encode(attrs, &engineered);

        tracing::debug!("Step 3: Assembling and scaling feature vector...");
        let row = self.bundle.assemble(attrs, &engineered, &encoded)?;
        let scaled = self.bundle.scale(&row)?;

        tracing::debug!("Step 4: Querying {} classifier...", self.bundle.classifier_kind());
        let probability = self.bundle.predict_proba(&scaled)?;
        if !probability.is_finite() {
            return Err(ModelError::NonFinite("classifier").into());
        }

        Ok(PredictionResult::new(
            probability.clamp(0.0, 1.0),
            attrs.key_factors(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, EnrollmentLabel};
    use crate::test_support::{demo_service, sample_patient};

    #[test]
    fn test_reference_patient_follows_decision_table() {
        let service = demo_service();
        let result = service.predict(&sample_patient()).expect("predict");

        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(result.confidence, Confidence::from_probability(result.probability));
        assert_eq!(result.prediction, result.confidence.label());
        assert_eq!(result.next_action, result.confidence.next_action());
        assert!((result.key_factors.distance - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unseen_categories_still_predict() {
        let service = demo_service();
        let patient = PatientAttributes {
            gender: "Unknown".into(),
            insurance_type: "Barter".into(),
            trial_phase: "Phase9".into(),
            disease_category: "Dermatology".into(),
            site_location: "Mars Base".into(),
            referral_source: "Carrier pigeon".into(),
            education_level: String::new(),
            ..sample_patient()
        };
        let result = service.predict(&patient).expect("unseen categories are recovered");
        assert!((0.0..=1.0).contains(&result.probability));
    }

    #[test]
    fn test_out_of_range_numbers_still_predict() {
        let service = demo_service();
        let patient = PatientAttributes {
            age: -4.0,
            bmi: 250.0,
            distance_to_site_miles: 900.0,
            ..sample_patient()
        };
        assert!(service.predict(&patient).is_ok());
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let service = demo_service();
        let a = service.predict(&sample_patient()).expect("predict");
        let b = service.predict(&sample_patient()).expect("predict");
        assert_eq!(a, b);
    }

    #[test]
    fn test_closer_site_is_more_likely_to_enroll() {
        let service = demo_service();
        let near = service.predict(&sample_patient()).expect("predict");
        let far = service
            .predict(&PatientAttributes {
                distance_to_site_miles: 180.0,
                ..sample_patient()
            })
            .expect("predict");
        assert!(near.probability > far.probability);
        assert_eq!(far.prediction, EnrollmentLabel::NotEnrolled);
    }

    #[test]
    fn test_concurrent_calls_share_bundle() {
        let service = demo_service();
        let expected = service.predict(&sample_patient()).expect("predict");

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| service.predict(&sample_patient()).expect("predict")))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().expect("thread"), expected);
            }
        });
    }
}
