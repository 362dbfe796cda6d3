//! PDF text extraction with a vision OCR fallback
//!
//! Fetches a remote PDF with a bearer credential, reads its embedded text
//! layer with lopdf and, when that yields almost nothing (scanned documents),
//! renders the first pages with PDFium and sends them to a vision model.
//!
//! Every external dependency sits behind a trait so the policy in
//! [`ExtractionOrchestrator`] can be exercised with test doubles:
//!
//! | Trait | Production implementation |
//! |-------|---------------------------|
//! | [`DocumentFetcher`] | [`HttpFetcher`] (reqwest) |
//! | [`TextExtractor`] | [`LopdfTextExtractor`] |
//! | [`PageRasterizer`] | [`PdfiumRasterizer`] |
//! | [`VisionRecognizer`] | [`AzureVisionRecognizer`] |

pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod raster;
pub mod text_layer;
pub mod types;
pub mod vision;

pub use config::{ExtractionLimits, VisionConfig};
pub use error::{AuthFailure, ExtractionError};
pub use fetch::{DocumentFetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use orchestrator::ExtractionOrchestrator;
pub use raster::{PageRasterizer, PdfiumRasterizer, RenderedPage};
pub use text_layer::{LopdfTextExtractor, TextExtractor};
pub use types::{
    DocumentMetadata, ExtractionRequest, ExtractionResult, FetchedDocument, PageContent,
    PageOutcome, TextLayer,
};
pub use vision::{AzureVisionRecognizer, VisionRecognizer};
