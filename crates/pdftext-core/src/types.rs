//! Data model shared by the extraction pipeline

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AuthFailure, ExtractionError};

/// A resolved extraction request: where the document lives and how to authorize
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub source_url: String,
    pub credential: String,
}

impl ExtractionRequest {
    /// Build a request, resolving the credential from the `Authorization`
    /// header first and the legacy body token second.
    pub fn resolve(
        source_url: impl Into<String>,
        authorization_header: Option<&str>,
        body_token: Option<&str>,
    ) -> Result<Self, ExtractionError> {
        let credential = resolve_credential(authorization_header, body_token)?;
        Ok(Self {
            source_url: source_url.into(),
            credential,
        })
    }
}

/// Pick the bearer credential. Only `Bearer <token>` headers count; anything
/// else falls through to the body token.
pub fn resolve_credential(
    authorization_header: Option<&str>,
    body_token: Option<&str>,
) -> Result<String, ExtractionError> {
    let from_header = authorization_header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let from_body = body_token.map(str::trim).filter(|token| !token.is_empty());

    from_header
        .or(from_body)
        .map(str::to_string)
        .ok_or(ExtractionError::Unauthorized(AuthFailure::Missing))
}

/// Raw document bytes, owned by one extraction call
#[derive(Clone, Debug)]
pub struct FetchedDocument {
    pub bytes: Arc<[u8]>,
    pub content_length: usize,
}

impl FetchedDocument {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let content_length = bytes.len();
        Self {
            bytes,
            content_length,
        }
    }
}

/// Text for a single page, 0-based
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub page_index: usize,
    pub text: String,
}

/// Document info dictionary fields, empty when absent
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub creator: String,
    pub creation_date: String,
}

/// Everything the text layer yields for a document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextLayer {
    pub pages: Vec<PageContent>,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

impl TextLayer {
    /// Join non-empty page texts with a blank line, in page order
    pub fn joined_text(&self) -> String {
        join_pages(self.pages.iter().map(|p| p.text.as_str()))
    }
}

/// Outcome of the vision path for one page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Recognized { page_index: usize, text: String },
    Failed { page_index: usize, reason: String },
}

impl PageOutcome {
    pub fn page_index(&self) -> usize {
        match self {
            PageOutcome::Recognized { page_index, .. } | PageOutcome::Failed { page_index, .. } => {
                *page_index
            }
        }
    }

    /// Recognized, but the model returned no text
    pub fn is_blank(&self) -> bool {
        matches!(self, PageOutcome::Recognized { text, .. } if text.is_empty())
    }

    /// Section for the aggregated text, headed by the 1-based page marker
    pub fn render_section(&self) -> String {
        let ordinal = self.page_index() + 1;
        match self {
            PageOutcome::Recognized { text, .. } => format!("--- Page {} ---\n{}", ordinal, text),
            PageOutcome::Failed { reason, .. } => {
                format!("--- Page {} ---\n[Error extracting text: {}]", ordinal, reason)
            }
        }
    }
}

/// Final response of an extraction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(rename = "text")]
    pub full_text: String,
    pub page_count: usize,
    pub char_count: usize,
    #[serde(rename = "used_vision_ocr")]
    pub used_vision_fallback: bool,
    pub metadata: DocumentMetadata,
}

impl ExtractionResult {
    /// Build a successful result; `char_count` is always derived from the text
    pub fn new(
        full_text: String,
        page_count: usize,
        used_vision_fallback: bool,
        metadata: DocumentMetadata,
    ) -> Self {
        Self {
            success: true,
            char_count: full_text.chars().count(),
            full_text,
            page_count,
            used_vision_fallback,
            metadata,
        }
    }
}

pub(crate) fn join_pages<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
