//! Document to text: rasterize pages, OCR each one, join the results.

pub mod ocr;
pub mod pdf;

pub use ocr::OcrEngine;
pub use pdf::PdfRasterizer;

use crate::config::OcrConfig;
use crate::error::ExtractionError;

pub trait TextExtractor: Send + Sync {
    /// Extracts the text of a whole document. Any failing page fails the call.
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError>;
}

/// Tesseract-backed extractor for PDFs and single-page raster images.
pub struct OcrExtractor {
    rasterizer: PdfRasterizer,
    ocr: OcrEngine,
}

impl OcrExtractor {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        Self {
            rasterizer: PdfRasterizer::new(dpi),
            ocr: OcrEngine::new(languages),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.languages, config.dpi)
    }
}

impl TextExtractor for OcrExtractor {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!("extract.document", bytes = document.len()).entered();

        let pages = if is_raster_image(document) {
            vec![document.to_vec()]
        } else {
            self.rasterizer.rasterize(document)?
        };

        let mut page_texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            page_texts.push(self.ocr.recognize(index + 1, page)?);
        }

        tracing::debug!("Extracted text from {} page(s)", page_texts.len());
        Ok(join_pages(&page_texts))
    }
}

fn is_raster_image(document: &[u8]) -> bool {
    image::guess_format(document).is_ok()
}

/// Joins page texts with newlines and trims the outer whitespace.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
