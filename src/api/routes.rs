//! Router and handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::application::PredictionService;
use crate::domain::{Confidence, EnrollmentLabel, KeyFactors, PatientAttributes};
use crate::EnrollwiseError;

use super::ApiError;

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    service: Arc<PredictionService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Body of a successful `/predict` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub patient_id: String,
    /// Percentage in [0, 100], two decimals
    pub enrollment_probability: f64,
    pub prediction: EnrollmentLabel,
    pub confidence: Confidence,
    pub recommendation: &'static str,
    pub next_action: &'static str,
    pub key_factors: KeyFactors,
}

/// Build the application router.
///
/// CORS is fully open without credentials; the service holds no session state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Clinical Trial Enrollment Prediction API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /predict": "Predict enrollment for single patient",
            "GET /health": "Check API health"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let bundle = state.service.bundle();
    Json(json!({
        "status": "healthy",
        "models_loaded": true,
        "model_kind": bundle.classifier_kind(),
        "n_features": bundle.feature_columns().len()
    }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PatientAttributes>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(attrs) = payload?;
    attrs
        .validate()
        .map_err(|errors| EnrollwiseError::Validation(errors.join("; ")))?;

    let patient_id = attrs.display_id();
    let result = state.service.predict(&attrs).map_err(|err| {
        tracing::error!("Prediction failed for {patient_id}: {err}");
        ApiError::from(err)
    })?;

    tracing::info!(
        "Prediction for {patient_id}: p={:.4} ({})",
        result.probability,
        result.confidence
    );

    Ok(Json(PredictResponse {
        success: true,
        enrollment_probability: result.enrollment_percent(),
        patient_id,
        prediction: result.prediction,
        confidence: result.confidence,
        recommendation: result.recommendation,
        next_action: result.next_action,
        key_factors: result.key_factors,
    }))
}
