//! Health check handler

use axum::{extract::State, Json};
use risk_core::constants::{APP_NAME, APP_VERSION};
use risk_core::logic::features::LayoutInfo;
use risk_core::{EngineStatus, PredictionStore};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: i64,
    model: EngineStatus,
    feature_layout: LayoutInfo,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Diabetes Prediction API!",
    })
}

pub async fn check<S: PredictionStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let model = state.pipeline.adapter().status();

    Json(HealthResponse {
        status: if model.model_loaded { "healthy" } else { "degraded" },
        service: APP_NAME,
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        model,
        feature_layout: LayoutInfo::current(),
    })
}
