use super::engine::{LanguageConfig, OcrEngine};
use crate::error::OcrError;
use image::GrayImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const WAIT_STEP: Duration = Duration::from_millis(10);

/// Tesseract OCR engine driving the command-line executable.
///
/// A fresh process runs per call, so the engine is freely shared between
/// recognition loops.
pub struct TesseractCliEngine {
    executable: PathBuf,
    timeout: Duration,
}

impl TesseractCliEngine {
    pub fn new<P: AsRef<Path>>(executable: P, timeout_secs: u64) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Command-line arguments after the input path
    fn arguments(language: &LanguageConfig) -> Vec<String> {
        let mut args = vec![
            "stdout".to_string(),
            "-l".to_string(),
            language.language.clone(),
            "--psm".to_string(),
            language.page_seg_mode.to_string(),
        ];
        for variable in &language.variables {
            args.push("-c".to_string());
            args.push(variable.clone());
        }
        args
    }
}

impl OcrEngine for TesseractCliEngine {
    fn recognize(&self, image: &GrayImage, language: &LanguageConfig) -> Result<String, OcrError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let mut child = Command::new(&self.executable)
            .arg(temp_input.path())
            .args(Self::arguments(language))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    OcrError::Unavailable(format!("{} not found", self.executable.display()))
                }
                _ => OcrError::Io(e),
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if child.try_wait()?.is_some() {
                break;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::Timeout(self.timeout.as_secs()));
            }
            thread::sleep(WAIT_STEP);
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Request(format!("Tesseract failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}
