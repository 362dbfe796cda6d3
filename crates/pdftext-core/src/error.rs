use thiserror::Error;

/// Every way an extraction request can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{0}")]
    Unauthorized(AuthFailure),

    #[error("Document not found at URL")]
    NotFound,

    #[error("Failed to fetch PDF: upstream returned {0}")]
    UpstreamError(u16),

    #[error(
        "PDF too large ({:.1}MB). Max size is {}MB",
        megabytes(.size),
        megabytes(.limit)
    )]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Timeout while fetching PDF")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to parse PDF: {0}")]
    MalformedDocument(String),

    #[error("Vision OCR unavailable: {0}")]
    VisionUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Why a request was not authorized
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No usable credential on the request
    #[error("Authorization token required (via header or body)")]
    Missing,

    /// The document store answered 401
    #[error("Unauthorized - token may be expired")]
    Rejected,
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

impl ExtractionError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::Unauthorized(_) => "UNAUTHORIZED",
            ExtractionError::NotFound => "NOT_FOUND",
            ExtractionError::UpstreamError(_) => "UPSTREAM_ERROR",
            ExtractionError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ExtractionError::Timeout => "TIMEOUT",
            ExtractionError::NetworkError(_) => "NETWORK_ERROR",
            ExtractionError::MalformedDocument(_) => "MALFORMED_DOCUMENT",
            ExtractionError::VisionUnavailable(_) => "VISION_UNAVAILABLE",
            ExtractionError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status that classifies the error kind.
    ///
    /// Upstream failures pass the document store's status through when it is
    /// itself an error status.
    pub fn http_status(&self) -> u16 {
        match self {
            ExtractionError::Unauthorized(_) => 401,
            ExtractionError::NotFound => 404,
            ExtractionError::UpstreamError(status) if (400..=599).contains(status) => *status,
            ExtractionError::UpstreamError(_) => 502,
            ExtractionError::PayloadTooLarge { .. } => 413,
            ExtractionError::Timeout => 504,
            ExtractionError::NetworkError(_) => 502,
            ExtractionError::MalformedDocument(_) => 422,
            ExtractionError::VisionUnavailable(_) => 503,
            ExtractionError::InternalError(_) => 500,
        }
    }

    /// Failures that abandon the whole vision fallback rather than one page
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, ExtractionError::VisionUnavailable(_))
    }
}
