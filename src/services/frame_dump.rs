use crate::models::region::RegionId;
use chrono::Local;
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Saves every OCR input image for offline inspection
#[derive(Debug, Clone)]
pub struct FrameDump {
    dir: PathBuf,
}

impl FrameDump {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Dump into the system temp directory
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn file_name(region: &RegionId) -> String {
        format!(
            "ocr_{}_{}.png",
            region,
            Local::now().format("%Y-%m-%d_%H-%M-%S%.3f")
        )
    }

    /// Write `image`; failures are logged and otherwise ignored
    pub fn save(&self, region: &RegionId, image: &GrayImage) -> Option<PathBuf> {
        let path = self.dir.join(Self::file_name(region));
        match image.save(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "dumped OCR input");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to dump OCR input");
                None
            }
        }
    }
}
