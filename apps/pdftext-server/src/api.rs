//! API handlers for the extraction server
//!
//! Provides REST endpoints for:
//! - Text extraction from a remote PDF
//! - Health reporting

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pdftext_core::{ExtractionRequest, ExtractionResult};

use crate::error::ApiError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub vision_ocr_available: bool,
}

/// Handler: GET /api/v1/health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: "pdf-extraction",
        vision_ocr_available: state.orchestrator.vision_available(),
    })
}

/// Extraction request body
#[derive(Debug, Deserialize)]
pub struct ExtractTextRequest {
    /// Document location in the store
    pub url: String,
    /// Legacy credential; the `Authorization` header takes precedence
    #[serde(default)]
    pub token: Option<String>,
}

/// Handler: POST /api/v1/documents/extract-text
pub async fn handle_extract_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ExtractTextRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError::InvalidRequest("url is required".into()));
    }

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let request = ExtractionRequest::resolve(url, authorization, body.token.as_deref())?;

    info!("Extracting text from {}", request.source_url);
    let result = state.orchestrator.extract(&request).await?;

    debug!(
        "Extracted {} chars from {} pages (vision OCR: {})",
        result.char_count, result.page_count, result.used_vision_fallback
    );

    Ok(Json(result))
}
