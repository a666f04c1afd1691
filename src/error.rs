use crate::models::region::RegionId;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems. These are programming or setup errors, never
/// runtime conditions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown region identifier: {0}")]
    UnknownRegion(RegionId),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to determine config directory")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures reported by an OCR collaborator
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    Unavailable(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfacing from one recognition poll
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("capture failed: {0}")]
    Capture(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("fingerprint store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RecognitionError {
    /// Whether the owning loop must stop instead of retrying next period
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
