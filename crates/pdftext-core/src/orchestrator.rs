//! Extraction orchestrator: fetch, text layer, and the vision fallback policy
//!
//! ## Flow
//!
//! 1. Fetch the document (size and status checks live in the fetcher)
//! 2. Parse the text layer on the blocking pool
//! 3. If the trimmed text is shorter than `min_text_chars` and the document has
//!    pages, render and recognize up to `max_vision_pages` pages in order
//! 4. Assemble the result; `char_count` is derived from the final text
//!
//! Vision failures never fail the request. A setup failure (see
//! [`ExtractionError::is_setup_failure`]) keeps the text-layer result; a
//! failing page keeps its slot with an inline error marker.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ExtractionLimits;
use crate::error::{AuthFailure, ExtractionError};
use crate::fetch::DocumentFetcher;
use crate::raster::{PageRasterizer, RenderedPage};
use crate::text_layer::TextExtractor;
use crate::types::{ExtractionRequest, ExtractionResult, FetchedDocument, PageOutcome, TextLayer};
use crate::vision::VisionRecognizer;

/// Composes the pipeline components; cheap to share across requests
pub struct ExtractionOrchestrator {
    fetcher: Arc<dyn DocumentFetcher>,
    text_extractor: Arc<dyn TextExtractor>,
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Option<Arc<dyn VisionRecognizer>>,
    limits: ExtractionLimits,
}

impl ExtractionOrchestrator {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        text_extractor: Arc<dyn TextExtractor>,
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Option<Arc<dyn VisionRecognizer>>,
        limits: ExtractionLimits,
    ) -> Self {
        Self {
            fetcher,
            text_extractor,
            rasterizer,
            recognizer,
            limits,
        }
    }

    pub fn limits(&self) -> &ExtractionLimits {
        &self.limits
    }

    /// Whether a recognizer was configured
    pub fn vision_available(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Run one extraction end to end
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        if request.credential.trim().is_empty() {
            return Err(ExtractionError::Unauthorized(AuthFailure::Missing));
        }

        let document = self
            .fetcher
            .fetch(
                &request.source_url,
                &request.credential,
                self.limits.max_document_bytes,
            )
            .await?;

        let text_layer = self.parse_text_layer(&document).await?;
        let candidate = text_layer.joined_text();

        if !should_use_vision(&candidate, text_layer.page_count, self.limits.min_text_chars) {
            return Ok(ExtractionResult::new(
                candidate,
                text_layer.page_count,
                false,
                text_layer.metadata,
            ));
        }

        info!(
            "Text layer yielded {} chars over {} pages, trying vision OCR",
            candidate.chars().count(),
            text_layer.page_count
        );

        match self.run_vision_fallback(&document, text_layer.page_count).await {
            Ok(outcomes) => {
                let text = assemble_vision_text(&outcomes);
                info!(
                    "Vision OCR extracted {} characters from {} pages",
                    text.chars().count(),
                    outcomes.len()
                );
                Ok(ExtractionResult::new(
                    text,
                    text_layer.page_count,
                    true,
                    text_layer.metadata,
                ))
            }
            Err(e) => {
                warn!("Vision OCR failed: {}", e);
                Ok(ExtractionResult::new(
                    candidate,
                    text_layer.page_count,
                    false,
                    text_layer.metadata,
                ))
            }
        }
    }

    async fn parse_text_layer(
        &self,
        document: &FetchedDocument,
    ) -> Result<TextLayer, ExtractionError> {
        let extractor = Arc::clone(&self.text_extractor);
        let bytes = Arc::clone(&document.bytes);

        tokio::task::spawn_blocking(move || extractor.extract_text_layer(&bytes))
            .await
            .map_err(|e| {
                ExtractionError::InternalError(format!("Text extraction task failed: {}", e))
            })?
    }

    /// Render and recognize the first pages in order.
    ///
    /// Returns `Err` only for setup-level failures; every selected page gets
    /// exactly one outcome otherwise.
    pub async fn run_vision_fallback(
        &self,
        document: &FetchedDocument,
        page_count: usize,
    ) -> Result<Vec<PageOutcome>, ExtractionError> {
        let recognizer = self.recognizer.as_ref().ok_or_else(|| {
            ExtractionError::VisionUnavailable("Azure OpenAI not configured for Vision OCR".into())
        })?;

        let pages = page_count.min(self.limits.max_vision_pages);
        info!("[Vision OCR] Converting {} PDF pages to images", pages);
        let rendered = self.render_pages(document, pages).await?;

        let mut outcomes = Vec::with_capacity(pages);
        for (page_index, image) in rendered.into_iter().enumerate() {
            info!("[Vision OCR] Processing page {}/{}", page_index + 1, pages);

            let outcome = match image {
                Ok(png) => match recognizer.recognize(&png, page_index + 1).await {
                    Ok(text) => PageOutcome::Recognized { page_index, text },
                    Err(e) if e.is_setup_failure() => return Err(e),
                    Err(e) => page_failure(page_index, e),
                },
                Err(e) if e.is_setup_failure() => return Err(e),
                Err(e) => page_failure(page_index, e),
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Render the first `pages` pages from a single open of the document
    async fn render_pages(
        &self,
        document: &FetchedDocument,
        pages: usize,
    ) -> Result<Vec<RenderedPage>, ExtractionError> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let bytes = Arc::clone(&document.bytes);
        let dpi = self.limits.render_dpi;

        let rendered = tokio::task::spawn_blocking(move || {
            let page_indices: Vec<usize> = (0..pages).collect();
            rasterizer.rasterize_pages(&bytes, &page_indices, dpi)
        })
        .await
        .map_err(|e| ExtractionError::InternalError(format!("Render task failed: {}", e)))??;

        if rendered.len() != pages {
            return Err(ExtractionError::InternalError(format!(
                "renderer returned {} pages, expected {}",
                rendered.len(),
                pages
            )));
        }
        Ok(rendered)
    }
}

fn page_failure(page_index: usize, error: ExtractionError) -> PageOutcome {
    warn!("[Vision OCR] Error on page {}: {}", page_index + 1, error);
    PageOutcome::Failed {
        page_index,
        reason: error.to_string(),
    }
}

/// Fallback trigger: too little text on a document that has pages
pub fn should_use_vision(candidate: &str, page_count: usize, min_text_chars: usize) -> bool {
    page_count > 0 && candidate.trim().chars().count() < min_text_chars
}

/// Join per-page sections in page order; pages recognized as empty are
/// left out, failed pages keep their marker
pub fn assemble_vision_text(outcomes: &[PageOutcome]) -> String {
    outcomes
        .iter()
        .filter(|outcome| !outcome.is_blank())
        .map(PageOutcome::render_section)
        .collect::<Vec<_>>()
        .join("\n\n")
}
