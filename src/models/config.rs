use crate::error::ConfigError;
use crate::models::region::{RegionId, RelativeRect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-region recognition tuning.
///
/// Values are configuration data; different game patches have needed
/// different numbers for the same region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionTuning {
    /// Relative capture box on screen
    pub capture_box: RelativeRect,
    /// Minimum Jaccard similarity for a catalog match
    pub text_similarity_threshold: f64,
    /// Binarization threshold for fingerprints (0-255, higher = cleaner)
    pub pixelset_threshold: u8,
    /// Binarization threshold for the OCR input
    pub ocr_threshold: u8,
    /// Accepted fraction of reference ink missing from the live sample
    pub fn_tolerance: f64,
    /// Accepted fraction of live ink absent from the reference
    pub fp_tolerance: f64,
    /// Minimum ink fraction before OCR is even considered
    pub min_ink_fraction: f64,
    /// Catalog is a small fixed set; OCR retires once every name is learned
    #[serde(default)]
    pub closed_catalog: bool,
    /// Search every candidate for the best match instead of the first
    #[serde(default = "default_exhaustive")]
    pub exhaustive: bool,
    /// Gate that must report the affordance present before capturing
    #[serde(default)]
    pub required_gate: Option<String>,
}

fn default_exhaustive() -> bool {
    true
}

impl RegionTuning {
    fn item(capture_box: RelativeRect) -> Self {
        Self {
            capture_box,
            text_similarity_threshold: 0.85,
            pixelset_threshold: 190,
            ocr_threshold: 115,
            fn_tolerance: 0.075,
            fp_tolerance: 0.70,
            min_ink_fraction: 0.005,
            closed_catalog: false,
            exhaustive: true,
            required_gate: None,
        }
    }

    fn menu_title() -> Self {
        Self {
            capture_box: RelativeRect::new(0.1278, 0.2000, 0.0700, 0.1800),
            text_similarity_threshold: 0.75,
            pixelset_threshold: 210,
            ocr_threshold: 170,
            fn_tolerance: 0.10,
            fp_tolerance: 0.70,
            min_ink_fraction: 0.005,
            closed_catalog: true,
            exhaustive: true,
            required_gate: None,
        }
    }

    fn character_name() -> Self {
        Self {
            capture_box: RelativeRect::new(0.2000, 0.2389, 0.1250, 0.2400),
            text_similarity_threshold: 0.85,
            pixelset_threshold: 200,
            ocr_threshold: 140,
            fn_tolerance: 0.05,
            fp_tolerance: 0.10,
            min_ink_fraction: 0.005,
            closed_catalog: true,
            exhaustive: true,
            required_gate: None,
        }
    }
}

/// What a recognition target feeds into the shared perception state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Menu,
    Character,
    Item,
}

/// One independently polled recognition target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    pub id: RegionId,
    pub kind: TargetKind,
    pub period_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Brightness probe deciding whether an on-screen control is shown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    pub probe_box: RelativeRect,
    /// Average luminance (0-255) above which the control counts as present
    pub brightness_threshold: f32,
}

/// OCR backend choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OcrBackend {
    /// OCR server speaking base64 JSON over HTTP
    Http { url: String },
    /// Local Tesseract executable
    Tesseract { executable: PathBuf },
}

impl Default for OcrBackend {
    fn default() -> Self {
        Self::Tesseract {
            executable: PathBuf::from("tesseract"),
        }
    }
}

/// OCR engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    pub language: String,
    pub page_seg_mode: u8,
    pub timeout_secs: u64,
    /// Extra `-c key=value` engine variables
    #[serde(default)]
    pub variables: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            language: "eng".to_string(),
            page_seg_mode: 7,
            timeout_secs: 2,
            variables: vec![
                "language_model_penalty_non_freq_dict_word=1".to_string(),
                "language_model_penalty_non_dict_word=1".to_string(),
                "tessedit_do_invert=0".to_string(),
            ],
        }
    }
}

/// Fingerprint persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Root of the fingerprint tree; platform data dir when unset
    pub fingerprint_root: Option<PathBuf>,
    /// Bumped whenever fingerprint extraction changes incompatibly
    pub cache_version: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fingerprint_root: None,
            cache_version: 2,
        }
    }
}

impl StorageConfig {
    pub fn resolved_root(&self) -> PathBuf {
        self.fingerprint_root.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("armament-helper")
                .join("fingerprints")
        })
    }
}

/// Diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DebugConfig {
    /// Save every OCR input image to the temp directory
    pub dump_frames: bool,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub targets: Vec<TargetConfig>,
    pub regions: BTreeMap<RegionId, RegionTuning>,
    pub gates: BTreeMap<String, GateConfig>,
    pub ocr: OcrConfig,
    pub storage: StorageConfig,
    pub debug: DebugConfig,
}

/// Gate name consulted when choosing between the two default item boxes
pub const REPLACE_PROMPT_GATE: &str = "replace-prompt";

const REPLACE_OFFSET: f32 = 0.3281;

impl Default for AppConfig {
    fn default() -> Self {
        let mut regions = BTreeMap::new();
        regions.insert(RegionId::from(RegionId::MENU_TITLE), RegionTuning::menu_title());
        regions.insert(
            RegionId::from(RegionId::CHARACTER_NAME),
            RegionTuning::character_name(),
        );
        regions.insert(
            RegionId::from(RegionId::ITEM_NAME_DEFAULT),
            RegionTuning::item(RelativeRect::new(0.2833, 0.3133, 0.3800, 0.5800)),
        );
        regions.insert(
            RegionId::from(RegionId::ITEM_NAME_DEFAULT_REPLACE),
            RegionTuning::item(RelativeRect::new(
                0.2833,
                0.3133,
                0.3800 + REPLACE_OFFSET,
                0.5800 + REPLACE_OFFSET,
            )),
        );
        regions.insert(
            RegionId::from(RegionId::ITEM_NAME_BOSS_DROP),
            RegionTuning::item(RelativeRect::new(0.2722, 0.3055, 0.4820, 0.6820)),
        );
        regions.insert(
            RegionId::from(RegionId::ITEM_NAME_SHOP),
            RegionTuning::item(RelativeRect::new(0.2555, 0.2889, 0.4000, 0.6000)),
        );

        let mut gates = BTreeMap::new();
        gates.insert(
            REPLACE_PROMPT_GATE.to_string(),
            GateConfig {
                probe_box: RelativeRect::new(0.2833, 0.3133, 0.7081, 0.7200),
                brightness_threshold: 95.0,
            },
        );

        Self {
            targets: vec![
                TargetConfig {
                    id: RegionId::from(RegionId::MENU_TITLE),
                    kind: TargetKind::Menu,
                    period_ms: 500,
                    enabled: true,
                },
                TargetConfig {
                    id: RegionId::from(RegionId::CHARACTER_NAME),
                    kind: TargetKind::Character,
                    period_ms: 200,
                    enabled: true,
                },
                TargetConfig {
                    id: RegionId::from(RegionId::ITEM_NAME_DEFAULT),
                    kind: TargetKind::Item,
                    period_ms: 200,
                    enabled: true,
                },
            ],
            regions,
            gates,
            ocr: OcrConfig::default(),
            storage: StorageConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl AppConfig {
    /// Tuning for a region; unknown regions are a configuration error
    pub fn tuning(&self, region: &RegionId) -> Result<&RegionTuning, ConfigError> {
        self.regions
            .get(region)
            .ok_or_else(|| ConfigError::UnknownRegion(region.clone()))
    }

    /// Check cross references between targets, regions and gates
    pub fn validate(&self) -> Result<(), ConfigError> {
        for target in &self.targets {
            self.tuning(&target.id)?;
            if target.period_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "target {} has a zero poll period",
                    target.id
                )));
            }
        }

        for (id, tuning) in &self.regions {
            if !tuning.capture_box.is_valid() {
                return Err(ConfigError::Invalid(format!("region {} has an empty capture box", id)));
            }
            for rate in [tuning.fn_tolerance, tuning.fp_tolerance, tuning.min_ink_fraction] {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(ConfigError::Invalid(format!(
                        "region {} has a rate outside [0, 1]: {}",
                        id, rate
                    )));
                }
            }
            if let Some(gate) = &tuning.required_gate {
                if !self.gates.contains_key(gate) {
                    return Err(ConfigError::Invalid(format!(
                        "region {} requires unknown gate {}",
                        id, gate
                    )));
                }
            }
        }

        Ok(())
    }
}
