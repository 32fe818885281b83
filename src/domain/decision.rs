//! Decision mapping from enrollment probability to an actionable tier.
//!
//! Thresholds are fixed and lower-bound inclusive:
//! `p >= 0.70` is HIGH, `0.50 <= p < 0.70` is MEDIUM, anything else LOW.

use serde::Serialize;

use super::patient::KeyFactors;

/// Probability at or above which a patient is predicted to enroll.
pub const ENROLLMENT_THRESHOLD: f64 = 0.50;

/// Probability at or above which an enrollment prediction is high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Binary enrollment prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrollmentLabel {
    #[serde(rename = "Enrolled")]
    Enrolled,
    #[serde(rename = "Not Enrolled")]
    NotEnrolled,
}

impl std::fmt::Display for EnrollmentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enrolled => write!(f, "Enrolled"),
            Self::NotEnrolled => write!(f, "Not Enrolled"),
        }
    }
}

/// Confidence tier attached to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Prioritize for enrollment
    High,
    /// Follow-up recommended
    Medium,
    /// Consider alternative trials
    Low,
}

impl Confidence {
    /// Map a probability to its tier. Non-finite input maps to `Low`.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_CONFIDENCE_THRESHOLD {
            Self::High
        } else if probability >= ENROLLMENT_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn label(&self) -> EnrollmentLabel {
        match self {
            Self::High | Self::Medium => EnrollmentLabel::Enrolled,
            Self::Low => EnrollmentLabel::NotEnrolled,
        }
    }

    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::High => "Prioritize for enrollment — high likelihood",
            Self::Medium => "Good candidate — follow-up recommended",
            Self::Low => "Low likelihood — consider alternative trials",
        }
    }

    #[must_use]
    pub fn next_action(&self) -> &'static str {
        match self {
            Self::High => "Schedule immediate screening call",
            Self::Medium => "Send informational materials and schedule call",
            Self::Low => "Explore other trial options or address barriers",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Outcome of a single prediction call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Class-1 probability in [0, 1]
    pub probability: f64,
    pub prediction: EnrollmentLabel,
    pub confidence: Confidence,
    pub recommendation: &'static str,
    pub next_action: &'static str,
    pub key_factors: KeyFactors,
}

impl PredictionResult {
    #[must_use]
    pub fn new(probability: f64, key_factors: KeyFactors) -> Self {
        let confidence = Confidence::from_probability(probability);
        Self {
            probability,
            prediction: confidence.label(),
            confidence,
            recommendation: confidence.recommendation(),
            next_action: confidence.next_action(),
            key_factors,
        }
    }

    /// Probability as a percentage rounded to two decimals.
    #[must_use]
    pub fn enrollment_percent(&self) -> f64 {
        (self.probability * 100.0 * 100.0).round() / 100.0
    }
}
