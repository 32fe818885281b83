use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::BundleLoader;
use crate::application::PredictionService;
use crate::domain::PatientAttributes;

/// Demo bundle shipped with the crate.
pub(crate) fn demo_bundle_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models")
}

pub(crate) fn sample_patient() -> PatientAttributes {
    PatientAttributes {
        age: 45.0,
        gender: "F".into(),
        bmi: 22.0,
        smoker: 0,
        chronic_conditions: 1,
        previous_trials: 2,
        distance_to_site_miles: 10.0,
        insurance_type: "Private".into(),
        education_level: "Bachelor".into(),
        trial_phase: "Phase2".into(),
        disease_category: "Oncology".into(),
        site_location: "SiteA".into(),
        referral_source: "Doctor".into(),
    }
}

pub(crate) fn demo_service() -> PredictionService {
    let bundle = BundleLoader::new(demo_bundle_dir())
        .load()
        .expect("demo bundle should load");
    PredictionService::new(Arc::new(bundle))
}
