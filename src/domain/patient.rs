//! Patient attributes accepted by the enrollment predictor.
//!
//! Thirteen required fields: six numeric, seven free-form categorical.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw numeric features that can be selected directly into the model vector.
pub const RAW_NUMERIC_FEATURES: [&str; 6] = [
    "age",
    "bmi",
    "smoker",
    "chronic_conditions",
    "previous_trials",
    "distance_to_site_miles",
];

/// Categorical fields supplied by the caller.
pub const RAW_CATEGORICAL_FEATURES: [&str; 7] = [
    "gender",
    "insurance_type",
    "education_level",
    "trial_phase",
    "disease_category",
    "site_location",
    "referral_source",
];

/// Modulus applied to the request digest when deriving the display id.
const PATIENT_ID_MODULUS: u64 = 10_000;

/// Candidate patient, as received at the service boundary.
///
/// Every field is required; unknown fields are rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientAttributes {
    /// Age in years
    pub age: f64,
    pub gender: String,
    /// Body mass index (kg/m²)
    pub bmi: f64,
    /// 0 = non-smoker, 1 = smoker
    pub smoker: u8,
    /// Number of diagnosed chronic conditions
    pub chronic_conditions: u32,
    /// Number of clinical trials previously joined
    pub previous_trials: u32,
    /// Travel distance to the trial site in miles
    pub distance_to_site_miles: f64,
    pub insurance_type: String,
    pub education_level: String,
    pub trial_phase: String,
    pub disease_category: String,
    pub site_location: String,
    pub referral_source: String,
}

/// Subset of the attributes echoed back with every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyFactors {
    pub age: f64,
    pub distance: f64,
    pub chronic_conditions: u32,
    pub previous_trials: u32,
}

impl PatientAttributes {
    /// Look up a raw numeric feature by name.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match name {
            "age" => Some(self.age),
            "bmi" => Some(self.bmi),
            "smoker" => Some(f64::from(self.smoker)),
            "chronic_conditions" => Some(f64::from(self.chronic_conditions)),
            "previous_trials" => Some(f64::from(self.previous_trials)),
            "distance_to_site_miles" => Some(self.distance_to_site_miles),
            _ => None,
        }
    }

    /// Look up a raw categorical feature by name.
    #[must_use]
    pub fn categorical(&self, name: &str) -> Option<&str> {
        match name {
            "gender" => Some(&self.gender),
            "insurance_type" => Some(&self.insurance_type),
            "education_level" => Some(&self.education_level),
            "trial_phase" => Some(&self.trial_phase),
            "disease_category" => Some(&self.disease_category),
            "site_location" => Some(&self.site_location),
            "referral_source" => Some(&self.referral_source),
            _ => None,
        }
    }

    /// Boundary checks that the type system alone does not enforce.
    ///
    /// Only non-finite numbers are rejected. Out-of-range values such as a
    /// negative distance are valid input and flow through derivation.
    ///
    /// # Errors
    /// Returns every violated constraint as a separate message.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.age.is_finite() {
            errors.push(format!("age {} must be a finite number", self.age));
        }
        if !self.bmi.is_finite() {
            errors.push(format!("bmi {} must be a finite number", self.bmi));
        }
        if !self.distance_to_site_miles.is_finite() {
            errors.push(format!(
                "distance_to_site_miles {} must be a finite number",
                self.distance_to_site_miles
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn key_factors(&self) -> KeyFactors {
        KeyFactors {
            age: self.age,
            distance: self.distance_to_site_miles,
            chronic_conditions: self.chronic_conditions,
            previous_trials: self.previous_trials,
        }
    }

    /// Display label derived from the serialized attributes.
    ///
    /// Identical content always yields the same label, but distinct patients
    /// can collide: this is not an identity and must never be used as a key.
    #[must_use]
    pub fn display_id(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        format!("P{}", u64::from_be_bytes(head) % PATIENT_ID_MODULUS)
    }
}
