//! Document fetching over HTTP with bearer authorization

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{AuthFailure, ExtractionError};
use crate::types::FetchedDocument;

/// Default wall-clock timeout for a document fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Retrieves raw document bytes
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the whole document, enforcing `max_bytes` on the result
    async fn fetch(
        &self,
        url: &str,
        credential: &str,
        max_bytes: usize,
    ) -> Result<FetchedDocument, ExtractionError>;
}

/// Fetcher backed by a shared `reqwest` client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::InternalError(format!("HTTP client setup: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        credential: &str,
        max_bytes: usize,
    ) -> Result<FetchedDocument, ExtractionError> {
        debug!("Fetching document from {}", url);

        let mut response = self
            .client
            .get(url)
            .bearer_auth(credential)
            .header(ACCEPT, "application/pdf")
            .send()
            .await
            .map_err(classify_transport_error)?;

        classify_status(response.status())?;

        // Refuse early when the store already announces an oversized body
        if let Some(announced) = announced_length(response.headers()) {
            check_size(announced, max_bytes)?;
        }

        // Chunked bodies carry no length; stop reading once past the limit
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify_transport_error)? {
            body.extend_from_slice(&chunk);
            check_size(body.len(), max_bytes)?;
        }

        debug!("Fetched {} bytes", body.len());
        Ok(FetchedDocument::new(body))
    }
}

/// Map an upstream status to the error taxonomy; 2xx passes
pub fn classify_status(status: StatusCode) -> Result<(), ExtractionError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(ExtractionError::Unauthorized(AuthFailure::Rejected)),
        StatusCode::NOT_FOUND => Err(ExtractionError::NotFound),
        other => {
            warn!("Document store returned {}", other);
            Err(ExtractionError::UpstreamError(other.as_u16()))
        }
    }
}

/// Reject documents larger than `max_bytes`
pub fn check_size(size: usize, max_bytes: usize) -> Result<(), ExtractionError> {
    if size > max_bytes {
        warn!("Document of {} bytes exceeds limit of {} bytes", size, max_bytes);
        return Err(ExtractionError::PayloadTooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

fn announced_length(headers: &reqwest::header::HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn classify_transport_error(err: reqwest::Error) -> ExtractionError {
    if err.is_timeout() {
        ExtractionError::Timeout
    } else {
        ExtractionError::NetworkError(err.to_string())
    }
}
