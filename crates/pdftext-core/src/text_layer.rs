//! Text-layer extraction using lopdf
//!
//! Reads the text the producing application embedded in each page's content
//! stream, plus the document info dictionary. Nothing is rendered here.

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::error::ExtractionError;
use crate::types::{DocumentMetadata, PageContent, TextLayer};

/// Extracts embedded text and metadata from PDF bytes
pub trait TextExtractor: Send + Sync {
    fn extract_text_layer(&self, data: &[u8]) -> Result<TextLayer, ExtractionError>;
}

/// lopdf-backed text-layer extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextExtractor;

impl LopdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for LopdfTextExtractor {
    fn extract_text_layer(&self, data: &[u8]) -> Result<TextLayer, ExtractionError> {
        let doc = Document::load_mem(data)
            .map_err(|e| ExtractionError::MalformedDocument(e.to_string()))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let pages = page_numbers
            .iter()
            .enumerate()
            .map(|(page_index, &page_number)| PageContent {
                page_index,
                text: page_text(&doc, page_number),
            })
            .collect::<Vec<_>>();

        debug!(
            "Text layer: {} pages, {} with text",
            pages.len(),
            pages.iter().filter(|p| !p.text.is_empty()).count()
        );

        Ok(TextLayer {
            page_count: pages.len(),
            pages,
            metadata: read_metadata(&doc),
        })
    }
}

/// Text of one page; pages lopdf cannot decode yield an empty string
fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text.trim_end().to_string(),
        Err(e) => {
            debug!("No text layer on page {}: {}", page_number, e);
            String::new()
        }
    }
}

fn read_metadata(doc: &Document) -> DocumentMetadata {
    let Some(info) = info_dictionary(doc) else {
        return DocumentMetadata::default();
    };

    DocumentMetadata {
        title: info_string(doc, info, b"Title"),
        author: info_string(doc, info, b"Author"),
        creator: info_string(doc, info, b"Creator"),
        creation_date: info_string(doc, info, b"CreationDate"),
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> String {
    let value = match info.get(key) {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok(),
        Ok(other) => Some(other),
        Err(_) => None,
    };

    match value {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        Some(Object::Name(bytes)) => decode_text_string(bytes),
        _ => String::new(),
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, then Latin-1
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}
