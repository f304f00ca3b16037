use std::io::Cursor;
use std::sync::Arc;

use crate::error::ExtractionError;

/// Tesseract wrapper. Cheap to clone; a fresh engine is created per page so
/// concurrent workers never share Tesseract state.
#[derive(Clone)]
pub struct OcrEngine {
    inner: Arc<OcrEngineInner>,
}

struct OcrEngineInner {
    languages: String,
}

impl OcrEngine {
    pub fn new(languages: &[String]) -> Self {
        let lang_str = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(OcrEngineInner {
                languages: lang_str,
            }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }

    /// Runs OCR over one page image. `page` is 1-based and only used for errors.
    pub fn recognize(&self, page: usize, image_data: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::debug_span!("extract.ocr", page).entered();
        let fail = |reason: String| ExtractionError::Ocr { page, reason };

        let img = image::load_from_memory(image_data)
            .map_err(|e| fail(format!("Failed to load image: {}", e)))?;

        // leptess reads PNG reliably regardless of the source encoding
        let mut png_data = Vec::new();
        img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| fail(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.languages)
            .map_err(|e| fail(format!("Failed to initialize Tesseract: {}", e)))?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| fail(format!("Failed to set image for OCR: {}", e)))?;

        lt.get_utf8_text()
            .map_err(|e| fail(format!("Failed to read OCR text: {}", e)))
    }
}
