//! Error responses for the extraction server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftext_core::ExtractionError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Server error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
    status: u16,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Extraction(err) => (
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_GATEWAY),
                err.code(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            warn!("Extraction failed with {}: {}", status, self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftext_core::AuthFailure;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extraction_errors_keep_their_status() {
        let cases = [
            (
                ExtractionError::Unauthorized(AuthFailure::Rejected),
                401,
                "UNAUTHORIZED",
            ),
            (ExtractionError::NotFound, 404, "NOT_FOUND"),
            (ExtractionError::UpstreamError(503), 503, "UPSTREAM_ERROR"),
            (
                ExtractionError::PayloadTooLarge {
                    size: 11 << 20,
                    limit: 10 << 20,
                },
                413,
                "PAYLOAD_TOO_LARGE",
            ),
            (ExtractionError::Timeout, 504, "TIMEOUT"),
            (ExtractionError::MalformedDocument("xref".into()), 422, "MALFORMED_DOCUMENT"),
        ];
        for (err, status, code) in cases {
            let (actual_status, actual_code) = ApiError::from(err).status_and_code();
            assert_eq!(actual_status.as_u16(), status);
            assert_eq!(actual_code, code);
        }
    }

    #[test]
    fn test_invalid_request_is_bad_request() {
        let (status, code) = ApiError::InvalidRequest("url is required".into()).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_REQUEST");
    }
}
