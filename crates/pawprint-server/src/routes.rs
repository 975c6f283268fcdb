//! HTTP routes and handlers

use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LoadMode;
use crate::error::ApiError;
use crate::metrics;
use crate::state::{AppState, HealthResponse};
use crate::upload::read_upload;

/// Query parameters for `POST /predict`
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    /// Also return the `top_k` best labels
    pub top_k: Option<usize>,
}

/// Body of a successful prediction
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    /// Percentage in `[0, 100]`, two decimals
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_predictions: Option<Vec<LabelConfidence>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub label: String,
    pub confidence: f64,
}

/// Classify an uploaded image
pub async fn predict(
    State(state): State<AppState>,
    params: Result<Query<PredictParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let result = run_predict(&state, params, multipart).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(response) => {
            metrics::record_request("success");
            info!(
                %request_id,
                prediction = %response.prediction,
                confidence = response.confidence,
                elapsed_ms,
                "Prediction served"
            );
        }
        Err(e) => {
            metrics::record_request(e.kind());
            if e.status().is_server_error() {
                warn!(%request_id, error = %e, elapsed_ms, "Prediction failed");
            } else {
                debug!(%request_id, error = %e, "Prediction rejected");
            }
        }
    }

    result.map(Json)
}

async fn run_predict(
    state: &AppState,
    params: Result<Query<PredictParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let top_k = match params.top_k {
        Some(0) => return Err(ApiError::BadRequest("top_k must be at least 1".to_string())),
        Some(k) => Some(k.min(state.config.max_top_k)),
        None => None,
    };

    if state.config.load_mode == LoadMode::Lazy {
        state.ensure_loading();
    }
    let classifier = state.slot.classifier()?;

    let mut multipart = multipart.map_err(|_| ApiError::NoFile)?;
    let upload = read_upload(
        &mut multipart,
        &state.config.upload_fields,
        state.config.max_upload_bytes,
    )
    .await?;
    debug!(
        filename = %upload.filename,
        field = %upload.field,
        bytes = upload.data.len(),
        content_type = upload.content_type.as_deref().unwrap_or("unknown"),
        "Upload received"
    );

    let result = classifier.classify(upload.data).await?;
    metrics::record_prediction(&result.prediction.label, result.latency_us);

    let top_predictions = top_k.map(|k| {
        result
            .top_k(classifier.labels(), k)
            .into_iter()
            .map(|scored| LabelConfidence {
                confidence: scored.confidence_percent(),
                label: scored.label,
            })
            .collect()
    });

    Ok(PredictResponse {
        confidence: result.prediction.confidence_percent(),
        prediction: result.prediction.label,
        top_predictions,
    })
}

/// Model readiness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.slot.health())
}

/// Prometheus exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
