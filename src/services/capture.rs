use crate::error::{ConfigError, RecognitionError};
use crate::models::config::{GateConfig, RegionTuning};
use crate::models::frame::Frame;
use crate::models::region::{RegionId, RelativeRect, Resolution};
use image::{imageops, ImageBuffer, Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const SCREENSHOT_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Source of cropped region frames
pub trait CaptureSource: Send + Sync {
    /// Capture the region's box as grayscale. `Ok(None)` when the region
    /// requires an on-screen control that is not shown.
    fn capture_and_crop(
        &self,
        region: &RegionId,
        tuning: &RegionTuning,
    ) -> Result<Option<(Resolution, Frame)>, RecognitionError>;

    /// Whether the named on-screen control is currently shown
    fn gate_present(&self, gate: &str) -> Result<bool, RecognitionError>;
}

/// Decides from a full screen image whether a control is shown
pub trait ButtonGate: Send + Sync {
    fn is_present(&self, screen: &RgbaImage) -> bool;
}

/// Calculates the average brightness (luminance) of an image.
///
/// Uses the ITU-R BT.601 luma formula: Y = 0.299*R + 0.587*G + 0.114*B
pub fn calculate_brightness(img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> f32 {
    let pixel_count = img.width() as f32 * img.height() as f32;
    if pixel_count == 0.0 {
        return 0.0;
    }

    let total: f32 = img
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
        })
        .sum();

    total / pixel_count
}

/// Control is present when its probe box is brighter than a threshold
#[derive(Debug, Clone)]
pub struct BrightnessGate {
    probe_box: RelativeRect,
    threshold: f32,
}

impl BrightnessGate {
    pub fn new(probe_box: RelativeRect, threshold: f32) -> Self {
        Self { probe_box, threshold }
    }
}

impl From<&GateConfig> for BrightnessGate {
    fn from(config: &GateConfig) -> Self {
        Self::new(config.probe_box, config.brightness_threshold)
    }
}

impl ButtonGate for BrightnessGate {
    fn is_present(&self, screen: &RgbaImage) -> bool {
        let resolution = Resolution::new(screen.width(), screen.height());
        let (x, y, w, h) = self.probe_box.to_pixels(resolution);
        let probe = imageops::crop_imm(screen, x, y, w, h).to_image();
        let brightness = calculate_brightness(&probe);
        debug!(brightness, threshold = self.threshold, "gate probe");
        brightness > self.threshold
    }
}

/// Capture source reading screenshots from disk.
///
/// `path` is either one image file or a directory, in which case the most
/// recently modified image in it is used.
pub struct ScreenshotFileCapture {
    path: PathBuf,
    gates: BTreeMap<String, Box<dyn ButtonGate>>,
}

impl ScreenshotFileCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            gates: BTreeMap::new(),
        }
    }

    /// Capture source with a brightness gate per configured gate
    pub fn with_gate_configs<P: AsRef<Path>>(path: P, gates: &BTreeMap<String, GateConfig>) -> Self {
        gates.iter().fold(Self::new(path), |capture, (name, config)| {
            capture.with_gate(name.clone(), BrightnessGate::from(config))
        })
    }

    pub fn with_gate(mut self, name: impl Into<String>, gate: impl ButtonGate + 'static) -> Self {
        self.gates.insert(name.into(), Box::new(gate));
        self
    }

    fn latest_screenshot(&self) -> Result<PathBuf, RecognitionError> {
        if !self.path.is_dir() {
            return Ok(self.path.clone());
        }

        let entries = fs::read_dir(&self.path).map_err(|source| RecognitionError::Io {
            path: self.path.clone(),
            source,
        })?;

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| SCREENSHOT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .max_by_key(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH)
            })
            .ok_or_else(|| {
                RecognitionError::Capture(format!("no screenshot found in {}", self.path.display()))
            })
    }

    fn load_screen(&self) -> Result<RgbaImage, RecognitionError> {
        let path = self.latest_screenshot()?;
        let screen = image::open(&path)
            .map_err(|e| RecognitionError::Capture(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(screen.to_rgba8())
    }

    fn check_gate(&self, gate: &str, screen: &RgbaImage) -> Result<bool, RecognitionError> {
        let button = self
            .gates
            .get(gate)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown gate {}", gate)))?;
        Ok(button.is_present(screen))
    }
}

impl CaptureSource for ScreenshotFileCapture {
    fn capture_and_crop(
        &self,
        region: &RegionId,
        tuning: &RegionTuning,
    ) -> Result<Option<(Resolution, Frame)>, RecognitionError> {
        let screen = self.load_screen()?;

        if let Some(gate) = &tuning.required_gate {
            if !self.check_gate(gate, &screen)? {
                debug!(%region, gate = %gate, "required control absent");
                return Ok(None);
            }
        }

        let resolution = Resolution::new(screen.width(), screen.height());
        let (x, y, w, h) = tuning.capture_box.to_pixels(resolution);
        if w == 0 || h == 0 {
            return Err(RecognitionError::Capture(format!(
                "region {} is empty at {}",
                region, resolution
            )));
        }

        let cropped = imageops::crop_imm(&screen, x, y, w, h).to_image();
        let gray = image::DynamicImage::ImageRgba8(cropped).to_luma8();
        Ok(Some((resolution, Frame::new(gray))))
    }

    fn gate_present(&self, gate: &str) -> Result<bool, RecognitionError> {
        let screen = self.load_screen()?;
        self.check_gate(gate, &screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::AppConfig;

    fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_calculate_brightness() {
        assert_eq!(calculate_brightness(&solid(4, 4, 0)), 0.0);
        assert!((calculate_brightness(&solid(4, 4, 200)) - 200.0).abs() < 0.01);
        assert_eq!(calculate_brightness(&RgbaImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_brightness_gate() {
        let gate = BrightnessGate::new(RelativeRect::new(0.0, 0.5, 0.0, 0.5), 95.0);
        let mut screen = solid(100, 100, 10);
        assert!(!gate.is_present(&screen));

        for y in 0..50 {
            for x in 0..50 {
                screen.put_pixel(x, y, Rgba([220, 220, 220, 255]));
            }
        }
        assert!(gate.is_present(&screen));
    }

    #[test]
    fn test_capture_crops_relative_box() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        solid(200, 100, 128).save(&path).unwrap();

        let capture = ScreenshotFileCapture::new(&path);
        let mut tuning = AppConfig::default()
            .tuning(&RegionId::from(RegionId::MENU_TITLE))
            .unwrap()
            .clone();
        tuning.capture_box = RelativeRect::new(0.5, 1.0, 0.25, 0.75);

        let (resolution, frame) = capture
            .capture_and_crop(&RegionId::from(RegionId::MENU_TITLE), &tuning)
            .unwrap()
            .unwrap();
        assert_eq!(resolution, Resolution::new(200, 100));
        assert_eq!((frame.width(), frame.height()), (100, 50));
        assert_eq!(frame.image().get_pixel(0, 0)[0], 128);
    }

    #[test]
    fn test_capture_from_directory_uses_image_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        solid(400, 300, 60).save(dir.path().join("shot.png")).unwrap();

        let capture = ScreenshotFileCapture::new(dir.path());
        let tuning = AppConfig::default()
            .tuning(&RegionId::from(RegionId::ITEM_NAME_SHOP))
            .unwrap()
            .clone();
        let captured = capture
            .capture_and_crop(&RegionId::from(RegionId::ITEM_NAME_SHOP), &tuning)
            .unwrap();
        assert!(captured.is_some());
    }

    #[test]
    fn test_required_gate_absent_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        solid(200, 100, 10).save(&path).unwrap();

        let config = AppConfig::default();
        let capture = ScreenshotFileCapture::with_gate_configs(&path, &config.gates);
        let mut tuning = config
            .tuning(&RegionId::from(RegionId::ITEM_NAME_DEFAULT_REPLACE))
            .unwrap()
            .clone();
        tuning.required_gate = Some(crate::models::config::REPLACE_PROMPT_GATE.to_string());

        let captured = capture
            .capture_and_crop(&RegionId::from(RegionId::ITEM_NAME_DEFAULT_REPLACE), &tuning)
            .unwrap();
        assert!(captured.is_none());
        assert!(!capture
            .gate_present(crate::models::config::REPLACE_PROMPT_GATE)
            .unwrap());
    }

    #[test]
    fn test_unknown_gate_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        solid(20, 20, 10).save(&path).unwrap();

        let capture = ScreenshotFileCapture::new(&path);
        let err = capture.gate_present("missing").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_screenshot_is_capture_error() {
        let capture = ScreenshotFileCapture::new("/nonexistent/screen.png");
        let err = capture.gate_present("any").unwrap_err();
        assert!(matches!(err, RecognitionError::Capture(_)));
    }
}
