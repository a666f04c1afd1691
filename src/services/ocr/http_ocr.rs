use super::engine::{LanguageConfig, OcrEngine};
use crate::error::OcrError;
use base64::{engine::general_purpose, Engine as _};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// HTTP OCR client talking to a local OCR server
pub struct HttpOcrEngine {
    base_url: String,
    timeout_secs: u64,
    // Built lazily on the blocking pool; the blocking client must not be
    // created inside an async context.
    client: OnceLock<reqwest::blocking::Client>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image_base64: String,
    language: &'a str,
}

/// Single text box reported by the server
#[derive(Deserialize, Clone, Debug)]
struct TextBox {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>,
    text: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    boxes: Vec<TextBox>,
    #[serde(default)]
    raw_text: String,
}

impl TextBox {
    /// Leftmost x-coordinate (for left-to-right sorting)
    fn left_x(&self) -> f64 {
        self.bbox
            .iter()
            .filter_map(|p| p.first().copied())
            .fold(f64::INFINITY, f64::min)
    }
}

impl HttpOcrEngine {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
            client: OnceLock::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, OcrError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| OcrError::Unavailable(format!("failed to create HTTP client: {}", e)))?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Encode image to base64 PNG
    fn encode_image(image: &GrayImage) -> Result<String, OcrError> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        Ok(general_purpose::STANDARD.encode(&buffer))
    }

    /// Sort boxes left-to-right and join their text; falls back to the
    /// server's concatenated text when no boxes were reported
    fn process_response(response: OcrResponse) -> String {
        if response.boxes.is_empty() {
            return response.raw_text;
        }

        let mut boxes = response.boxes;
        boxes.sort_by(|a, b| {
            a.left_x()
                .partial_cmp(&b.left_x())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        boxes
            .iter()
            .map(|b| b.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn map_request_error(&self, e: reqwest::Error) -> OcrError {
        if e.is_timeout() {
            OcrError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            OcrError::Unavailable(format!("{}: {}", self.base_url, e))
        } else {
            OcrError::Request(e.to_string())
        }
    }
}

impl OcrEngine for HttpOcrEngine {
    fn recognize(&self, image: &GrayImage, language: &LanguageConfig) -> Result<String, OcrError> {
        let image_base64 = Self::encode_image(image)?;
        let url = format!("{}/ocr", self.base_url);

        let response = self
            .client()?
            .post(&url)
            .json(&ImageRequest {
                image_base64,
                language: &language.language,
            })
            .send()
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OcrError::Request(format!("OCR server error {}: {}", status, error_text)));
        }

        let data: OcrResponse = response
            .json()
            .map_err(|e| OcrError::Request(format!("failed to parse response: {}", e)))?;

        Ok(Self::process_response(data))
    }

    fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        self.client()
            .and_then(|client| client.get(&url).send().map_err(|e| self.map_request_error(e)))
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
