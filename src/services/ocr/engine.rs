use crate::error::OcrError;
use crate::models::config::OcrConfig;
use image::GrayImage;

/// Language and engine options passed with every recognition call
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    pub language: String,
    pub page_seg_mode: u8,
    /// Extra `key=value` engine variables
    pub variables: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::from(&OcrConfig::default())
    }
}

impl From<&OcrConfig> for LanguageConfig {
    fn from(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
            variables: config.variables.clone(),
        }
    }
}

/// OCR Engine trait - abstraction for different OCR implementations
pub trait OcrEngine: Send + Sync {
    /// Recognize a single line of text from a binarized image
    fn recognize(&self, image: &GrayImage, language: &LanguageConfig) -> Result<String, OcrError>;

    /// Check if the OCR engine is reachable
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}
