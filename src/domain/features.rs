//! Engineered features derived from raw patient attributes.
//!
//! Derivation is total: every input, including out-of-range or non-finite
//! numbers, yields a value. Inputs outside every bin leave the category unset
//! (`None`), which later encodes through the categorical fallback.

use serde::Serialize;

use super::patient::PatientAttributes;

/// Engineered numeric features that can be selected into the model vector.
pub const ENGINEERED_NUMERIC_FEATURES: [&str; 5] = [
    "site_nearby",
    "high_risk",
    "trial_experienced",
    "patient_risk_score",
    "accessibility_score",
];

/// Engineered categorical features available to encoders.
pub const ENGINEERED_CATEGORICAL_FEATURES: [&str; 2] = ["age_group", "bmi_category"];

/// Distance (miles) below which a site counts as nearby.
const NEARBY_SITE_MILES: f64 = 30.0;

/// Chronic condition count at which a patient counts as high risk.
const HIGH_RISK_CONDITIONS: u32 = 3;

/// Age bands. Lower edges are inclusive; the last band also includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeGroup {
    /// [0, 30)
    Young,
    /// [30, 50)
    Middle,
    /// [50, 65)
    Senior,
    /// [65, 100]
    Elderly,
}

impl AgeGroup {
    /// Bin an age, or `None` when it lies outside [0, 100].
    #[must_use]
    pub fn from_age(age: f64) -> Option<Self> {
        if (0.0..30.0).contains(&age) {
            Some(Self::Young)
        } else if (30.0..50.0).contains(&age) {
            Some(Self::Middle)
        } else if (50.0..65.0).contains(&age) {
            Some(Self::Senior)
        } else if (65.0..=100.0).contains(&age) {
            Some(Self::Elderly)
        } else {
            None
        }
    }

    /// Category label as seen by the fitted encoders.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Young => "Young",
            Self::Middle => "Middle",
            Self::Senior => "Senior",
            Self::Elderly => "Elderly",
        }
    }
}

/// BMI bands. Lower edges are inclusive; the last band also includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Option<Self> {
        if (0.0..18.5).contains(&bmi) {
            Some(Self::Underweight)
        } else if (18.5..25.0).contains(&bmi) {
            Some(Self::Normal)
        } else if (25.0..30.0).contains(&bmi) {
            Some(Self::Overweight)
        } else if (30.0..=100.0).contains(&bmi) {
            Some(Self::Obese)
        } else {
            None
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// Features computed from [`PatientAttributes`], never supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineeredFeatures {
    pub age_group: Option<AgeGroup>,
    pub bmi_category: Option<BmiCategory>,
    /// 1 when the site is closer than 30 miles
    pub site_nearby: u8,
    /// 1 with three or more chronic conditions
    pub high_risk: u8,
    /// 1 when the patient joined at least one earlier trial
    pub trial_experienced: u8,
    /// chronic_conditions × 2 + age / 20 + previous_trials × 3
    pub patient_risk_score: f64,
    /// 100 − distance, clamped to [0, 100]
    pub accessibility_score: f64,
}

impl EngineeredFeatures {
    /// Derive the engineered feature set. Pure and deterministic.
    #[must_use]
    pub fn derive(attrs: &PatientAttributes) -> Self {
        let chronic = f64::from(attrs.chronic_conditions);
        let previous = f64::from(attrs.previous_trials);

        Self {
            age_group: AgeGroup::from_age(attrs.age),
            bmi_category: BmiCategory::from_bmi(attrs.bmi),
            site_nearby: u8::from(attrs.distance_to_site_miles < NEARBY_SITE_MILES),
            high_risk: u8::from(attrs.chronic_conditions >= HIGH_RISK_CONDITIONS),
            trial_experienced: u8::from(attrs.previous_trials > 0),
            patient_risk_score: chronic * 2.0 + attrs.age / 20.0 + previous * 3.0,
            accessibility_score: (100.0 - attrs.distance_to_site_miles).clamp(0.0, 100.0),
        }
    }

    /// Look up an engineered numeric feature by name.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match name {
            "site_nearby" => Some(f64::from(self.site_nearby)),
            "high_risk" => Some(f64::from(self.high_risk)),
            "trial_experienced" => Some(f64::from(self.trial_experienced)),
            "patient_risk_score" => Some(self.patient_risk_score),
            "accessibility_score" => Some(self.accessibility_score),
            _ => None,
        }
    }

    /// Label of an engineered categorical feature; `None` when unbinned or unknown.
    #[must_use]
    pub fn categorical(&self, name: &str) -> Option<&'static str> {
        match name {
            "age_group" => self.age_group.map(AgeGroup::label),
            "bmi_category" => self.bmi_category.map(BmiCategory::label),
            _ => None,
        }
    }
}
