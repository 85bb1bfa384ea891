//! Report upload, prediction and history handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use risk_core::{FieldMap, PredictionOutcome, PredictionStore, StoredPrediction};
use serde::Serialize;

use crate::middleware::auth::UserContext;
use crate::{AppError, AppResult, AppState};

/// Multipart field carrying the report
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub extracted_data: FieldMap,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub extracted_data: Vec<StoredPrediction>,
}

/// Upload a report and make its fields the user's current record
pub async fn extract_patient_data<S: PredictionStore>(
    State(state): State<AppState<S>>,
    user: UserContext,
    mut multipart: Multipart,
) -> AppResult<Json<ExtractionResponse>> {
    tracing::info!("Extracting data from report for user: {}", user.username);

    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            document = Some(bytes.to_vec());
            break;
        }
    }

    let document = document
        .ok_or_else(|| AppError::BadRequest(format!("Missing '{}' field", FILE_FIELD)))?;

    let extracted_data = state.pipeline.upload(&user.username, document).await?;
    Ok(Json(ExtractionResponse { extracted_data }))
}

/// Predict from the user's current record
pub async fn predict<S: PredictionStore>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> AppResult<Json<PredictionOutcome>> {
    tracing::info!("Prediction requested by user: {}", user.username);

    let outcome = state.pipeline.predict(&user.username).await?;
    Ok(Json(outcome))
}

/// All saved predictions for the user
pub async fn get_patient_data<S: PredictionStore>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> AppResult<Json<HistoryResponse>> {
    tracing::info!("Fetching patient data for user: {}", user.username);

    let extracted_data = state.pipeline.history(&user.username).await?;
    Ok(Json(HistoryResponse { extracted_data }))
}
