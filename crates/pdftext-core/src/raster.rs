//! Page rasterization via PDFium
//!
//! PDFium is bound once per process and serialized behind a mutex; the library
//! is not safe to drive from several threads at once.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;

/// PDF page units per inch
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// PNG bytes for one page, or why that page could not be rendered
pub type RenderedPage = Result<Vec<u8>, ExtractionError>;

/// Renders pages of a PDF to PNG bytes
pub trait PageRasterizer: Send + Sync {
    /// Open the document once and render `page_indices` in order.
    ///
    /// `Err` means the document cannot be rendered at all (no renderer, or the
    /// renderer rejects the file) and is a `VisionUnavailable` setup failure.
    /// Otherwise every requested page gets exactly one entry.
    fn rasterize_pages(
        &self,
        data: &[u8],
        page_indices: &[usize],
        dpi: u32,
    ) -> Result<Vec<RenderedPage>, ExtractionError>;
}

/// Linear scale factor from page units to pixels at `dpi`
pub fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / PDF_POINTS_PER_INCH
}

/// PDFium-backed rasterizer
pub struct PdfiumRasterizer {
    pdfium: Result<Mutex<Pdfium>, String>,
}

impl PdfiumRasterizer {
    /// Bind PDFium, searching `library_dir` first, then the working directory,
    /// then the system library paths.
    ///
    /// A failed bind is kept and reported on every `rasterize_pages` call as a
    /// setup-level failure.
    pub fn new(library_dir: Option<&Path>) -> Self {
        let pdfium = bind_pdfium(library_dir).map(Mutex::new);
        match &pdfium {
            Ok(_) => info!("PDFium bound for page rendering"),
            Err(e) => warn!("PDFium unavailable, vision OCR will be skipped: {}", e),
        }
        Self { pdfium }
    }

    pub fn is_available(&self) -> bool {
        self.pdfium.is_ok()
    }
}

fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium, String> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = library_dir {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(PathBuf::from("./"));

    let local = candidates.iter().find_map(|dir| {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)).ok()
    });
    let bindings = match local {
        Some(bindings) => bindings,
        None => Pdfium::bind_to_system_library()
            .map_err(|e| format!("failed to load PDFium library: {:?}", e))?,
    };

    Ok(Pdfium::new(bindings))
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize_pages(
        &self,
        data: &[u8],
        page_indices: &[usize],
        dpi: u32,
    ) -> Result<Vec<RenderedPage>, ExtractionError> {
        let pdfium = self
            .pdfium
            .as_ref()
            .map_err(|e| ExtractionError::VisionUnavailable(e.clone()))?;
        let pdfium = pdfium
            .lock()
            .map_err(|_| ExtractionError::InternalError("PDFium lock poisoned".into()))?;

        let document = pdfium.load_pdf_from_byte_slice(data, None).map_err(|e| {
            ExtractionError::VisionUnavailable(format!("PDFium could not open document: {:?}", e))
        })?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale_for_dpi(dpi));
        let rendered = page_indices
            .iter()
            .map(|&page_index| render_page(&document, page_index, &config, dpi))
            .collect();

        // The document handle drops here, before the lock is released
        Ok(rendered)
    }
}

fn render_page(
    document: &PdfDocument<'_>,
    page_index: usize,
    config: &PdfRenderConfig,
    dpi: u32,
) -> RenderedPage {
    let index = page_index.try_into().map_err(|_| {
        ExtractionError::InternalError(format!("page index {} out of range", page_index))
    })?;
    let page = document.pages().get(index).map_err(|e| {
        ExtractionError::InternalError(format!("page {}: {:?}", page_index + 1, e))
    })?;

    let bitmap = page.render_with_config(config).map_err(|e| {
        ExtractionError::InternalError(format!("render page {}: {:?}", page_index + 1, e))
    })?;

    let width = bitmap.width() as u32;
    let height = bitmap.height() as u32;
    let rgba = bitmap.as_rgba_bytes();
    debug!("Rendered page {} at {} DPI ({}x{})", page_index + 1, dpi, width, height);

    encode_png(&rgba, width, height)
}

/// Encode tightly packed RGBA pixels as PNG
pub fn encode_png(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExtractionError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(ExtractionError::InternalError(format!(
            "bitmap has {} bytes, expected {} for {}x{} RGBA",
            rgba.len(),
            expected,
            width,
            height
        )));
    }

    let mut png_bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ExtractionError::InternalError(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| ExtractionError::InternalError(format!("PNG data: {}", e)))?;
        writer
            .finish()
            .map_err(|e| ExtractionError::InternalError(format!("PNG finish: {}", e)))?;
    }
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_150_dpi_scale() {
        let scale = scale_for_dpi(150);
        assert!((scale - 2.0833).abs() < 0.001);
        assert_eq!(scale_for_dpi(72), 1.0);
    }

    #[test]
    fn test_encode_png_signature() {
        let rgba = vec![255u8; 4 * 3 * 2];
        let png = encode_png(&rgba, 3, 2).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let result = encode_png(&[0u8; 7], 2, 2);
        assert!(matches!(result, Err(ExtractionError::InternalError(_))));
    }
}
