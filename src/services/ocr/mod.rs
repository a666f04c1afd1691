pub mod engine;
pub mod http_ocr;
pub mod tesseract;

// Re-export main types
pub use engine::{LanguageConfig, OcrEngine};
pub use http_ocr::HttpOcrEngine;
pub use tesseract::TesseractCliEngine;

use crate::models::config::{OcrBackend, OcrConfig};
use std::sync::Arc;

/// Build the configured OCR backend
pub fn build_engine(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    match &config.backend {
        OcrBackend::Http { url } => Arc::new(HttpOcrEngine::new(url.clone(), config.timeout_secs)),
        OcrBackend::Tesseract { executable } => {
            Arc::new(TesseractCliEngine::new(executable, config.timeout_secs))
        }
    }
}
