//! Test doubles and PDF fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

use pdftext_core::{
    DocumentFetcher, DocumentMetadata, ExtractionError, ExtractionLimits,
    ExtractionOrchestrator, FetchedDocument, PageContent, PageRasterizer, RenderedPage,
    TextExtractor, TextLayer, VisionRecognizer,
};

/// Fetcher returning a canned document or error
pub struct StaticFetcher {
    result: Result<Vec<u8>, ExtractionError>,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn ok(bytes: Vec<u8>) -> Self {
        Self {
            result: Ok(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(
        &self,
        _url: &str,
        _credential: &str,
        max_bytes: usize,
    ) -> Result<FetchedDocument, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self.result.clone()?;
        if bytes.len() > max_bytes {
            return Err(ExtractionError::PayloadTooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(FetchedDocument::new(bytes))
    }
}

/// Text extractor returning a fixed layer regardless of input
pub struct FixedTextExtractor {
    result: Result<TextLayer, ExtractionError>,
    pub calls: AtomicUsize,
}

impl FixedTextExtractor {
    pub fn with_pages(texts: &[&str]) -> Self {
        let pages = texts
            .iter()
            .enumerate()
            .map(|(page_index, text)| PageContent {
                page_index,
                text: text.to_string(),
            })
            .collect::<Vec<_>>();
        Self {
            result: Ok(TextLayer {
                page_count: pages.len(),
                pages,
                metadata: DocumentMetadata::default(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextExtractor for FixedTextExtractor {
    fn extract_text_layer(&self, _data: &[u8]) -> Result<TextLayer, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Rasterizer that records requested pages and returns a one-byte "image"
/// holding the page index
#[derive(Default)]
pub struct RecordingRasterizer {
    pub failing_pages: Vec<usize>,
    pub open_failure: Option<ExtractionError>,
    pub opens: AtomicUsize,
    pub rendered: Mutex<Vec<usize>>,
}

impl RecordingRasterizer {
    pub fn failing_on(pages: &[usize]) -> Self {
        Self {
            failing_pages: pages.to_vec(),
            ..Self::default()
        }
    }

    /// No renderer bound
    pub fn unavailable() -> Self {
        Self::refusing(ExtractionError::VisionUnavailable("no renderer".into()))
    }

    /// Renderer present but the document does not open
    pub fn unreadable() -> Self {
        Self::refusing(ExtractionError::VisionUnavailable(
            "PDFium could not open document: FormatError".into(),
        ))
    }

    fn refusing(error: ExtractionError) -> Self {
        Self {
            open_failure: Some(error),
            ..Self::default()
        }
    }

    pub fn rendered_pages(&self) -> Vec<usize> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl PageRasterizer for RecordingRasterizer {
    fn rasterize_pages(
        &self,
        _data: &[u8],
        page_indices: &[usize],
        _dpi: u32,
    ) -> Result<Vec<RenderedPage>, ExtractionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.open_failure {
            return Err(error.clone());
        }

        Ok(page_indices
            .iter()
            .map(|&page_index| {
                self.rendered.lock().unwrap().push(page_index);
                if self.failing_pages.contains(&page_index) {
                    return Err(ExtractionError::InternalError(format!(
                        "cannot render page {}",
                        page_index + 1
                    )));
                }
                Ok(vec![page_index as u8])
            })
            .collect())
    }
}

/// Recognizer that reads the page index back out of the fake image
#[derive(Default)]
pub struct ScriptedRecognizer {
    pub failing_ordinals: Vec<usize>,
    pub blank: bool,
    pub seen: Mutex<Vec<usize>>,
}

impl ScriptedRecognizer {
    pub fn failing_on(ordinals: &[usize]) -> Self {
        Self {
            failing_ordinals: ordinals.to_vec(),
            ..Self::default()
        }
    }

    /// Model that answers every page with no text
    pub fn blank() -> Self {
        Self {
            blank: true,
            ..Self::default()
        }
    }

    pub fn seen_ordinals(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionRecognizer for ScriptedRecognizer {
    async fn recognize(&self, png: &[u8], page_ordinal: usize) -> Result<String, ExtractionError> {
        self.seen.lock().unwrap().push(page_ordinal);
        if self.failing_ordinals.contains(&page_ordinal) {
            return Err(ExtractionError::NetworkError("Vision API error 429".into()));
        }
        if self.blank {
            return Ok(String::new());
        }
        Ok(format!("Scanned text of page {} (image {:?})", page_ordinal, png))
    }
}

/// Bundle of doubles wired into an orchestrator
pub struct Harness {
    pub fetcher: Arc<StaticFetcher>,
    pub extractor: Arc<dyn TextExtractor>,
    pub rasterizer: Arc<RecordingRasterizer>,
    pub recognizer: Option<Arc<ScriptedRecognizer>>,
    pub limits: ExtractionLimits,
}

impl Harness {
    pub fn new(fetcher: StaticFetcher, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor,
            rasterizer: Arc::new(RecordingRasterizer::default()),
            recognizer: Some(Arc::new(ScriptedRecognizer::default())),
            limits: ExtractionLimits::default(),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: RecordingRasterizer) -> Self {
        self.rasterizer = Arc::new(rasterizer);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Option<ScriptedRecognizer>) -> Self {
        self.recognizer = recognizer.map(Arc::new);
        self
    }

    pub fn orchestrator(&self) -> ExtractionOrchestrator {
        ExtractionOrchestrator::new(
            self.fetcher.clone(),
            self.extractor.clone(),
            self.rasterizer.clone(),
            self.recognizer
                .clone()
                .map(|r| r as Arc<dyn VisionRecognizer>),
            self.limits.clone(),
        )
    }

    pub fn rendered_pages(&self) -> Vec<usize> {
        self.rasterizer.rendered_pages()
    }
}

/// Build a PDF with one page per entry; `None` pages have no text operators,
/// like a scanned page
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    let mut page_ids = Vec::new();
    for text in pages {
        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![Operation::new("q", vec![]), Operation::new("Q", vec![])],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        page_ids.push(doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ])));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
