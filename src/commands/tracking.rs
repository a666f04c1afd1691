use crate::error::RecognitionError;
use crate::models::catalog::Catalog;
use crate::models::config::AppConfig;
use crate::models::region::RegionId;
use crate::services::capture::{CaptureSource, ScreenshotFileCapture};
use crate::services::fingerprint_store::{prune_stale_versions, versioned_root, FingerprintStore};
use crate::services::labels::{ExtensionMode, ExtensionRegistry, Labeler, WeaponTierExtension};
use crate::services::ocr::{build_engine, OcrEngine};
use crate::services::perception::PerceptionSnapshot;
use crate::services::polling::{LoopSummary, RecognitionTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How long and against what to run the recognizers
#[derive(Debug, Clone)]
pub struct TrackingOptions {
    pub screenshot: PathBuf,
    pub catalog: Option<PathBuf>,
    /// Stop after this long; run until Ctrl-C when unset
    pub duration: Option<Duration>,
    /// Character picked by hand before detection starts
    pub character: Option<String>,
    /// Targets whose loops start paused
    pub paused_targets: Vec<RegionId>,
    /// Append the weapon tier to the item labels
    pub weapon_tier: bool,
}

/// Outcome of a tracking session
#[derive(Debug)]
pub struct TrackingReport {
    pub snapshot: PerceptionSnapshot,
    pub loops: Vec<LoopSummary>,
}

/// Drop stale cache versions and load the current one
pub fn open_fingerprint_store(config: &AppConfig) -> Result<FingerprintStore, RecognitionError> {
    let root = config.storage.resolved_root();
    for removed in prune_stale_versions(&root, config.storage.cache_version)? {
        info!(path = %removed.display(), "removed stale fingerprint cache");
    }

    let store = FingerprintStore::load(versioned_root(&root, config.storage.cache_version))?;
    Ok(store)
}

pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, RecognitionError> {
    match path {
        Some(path) => Ok(Catalog::load(path)?),
        None => Ok(Catalog::default()),
    }
}

pub fn build_labeler(weapon_tier: bool) -> Labeler {
    let mut registry = ExtensionRegistry::new();
    if weapon_tier {
        registry.register(ExtensionMode::After, Arc::new(WeaponTierExtension));
    }
    registry.resolve()
}

/// Run every enabled recognition loop until the duration elapses or Ctrl-C.
///
/// Builds its own tokio runtime; collaborators holding blocking clients are
/// created and dropped outside of it.
pub fn run_tracking(config: AppConfig, options: TrackingOptions) -> Result<TrackingReport, Box<dyn std::error::Error>> {
    config.validate()?;
    let config = Arc::new(config);

    let store = Arc::new(open_fingerprint_store(&config)?);
    let catalog = Arc::new(load_catalog(options.catalog.as_deref())?);

    let ocr: Arc<dyn OcrEngine> = build_engine(&config.ocr);
    if !ocr.is_available() {
        warn!(engine = ocr.name(), "OCR engine not reachable, recognitions will fail until it is");
    }

    let capture: Arc<dyn CaptureSource> = Arc::new(ScreenshotFileCapture::with_gate_configs(
        &options.screenshot,
        &config.gates,
    ));

    let tracker = RecognitionTracker::new(
        Arc::clone(&config),
        catalog,
        store,
        Arc::clone(&ocr),
        capture,
    )
    .with_labeler(build_labeler(options.weapon_tier));

    if options.character.is_some() {
        tracker.select_character(options.character.clone());
    }
    for target in &options.paused_targets {
        tracker.set_target_enabled(target, false);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let loops = runtime.block_on(async {
        tracker.start_tracking();

        match options.duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
            }
        }

        tracker.stop_tracking();
        tracker.join().await
    });

    Ok(TrackingReport {
        snapshot: tracker.snapshot(),
        loops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::Fingerprint;
    use crate::models::region::Resolution;

    #[test]
    fn test_open_store_prunes_old_versions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.fingerprint_root = Some(dir.path().to_path_buf());
        config.storage.cache_version = 2;

        let stale = dir.path().join("v1").join("1920x1080");
        std::fs::create_dir_all(&stale).unwrap();

        let current = FingerprintStore::empty(versioned_root(dir.path(), 2));
        let fp = Fingerprint::from_points((0..12).map(|x| (x, 0)));
        current
            .save(Resolution::new(1920, 1080), &RegionId::from(RegionId::MENU_TITLE), "SHOP", &fp)
            .unwrap();

        let store = open_fingerprint_store(&config).unwrap();
        assert!(!dir.path().join("v1").exists());
        assert!(store
            .get(Resolution::new(1920, 1080), &RegionId::from(RegionId::MENU_TITLE), "SHOP")
            .is_some());
    }

    #[test]
    fn test_build_labeler_extensions() {
        assert_eq!(build_labeler(false).extension_names(), vec!["default"]);
        assert_eq!(build_labeler(true).extension_names(), vec!["default", "weapon_tier"]);
    }

    #[test]
    fn test_load_catalog_default_and_missing() {
        assert_eq!(load_catalog(None).unwrap().characters.len(), 8);
        let err = load_catalog(Some(Path::new("/nonexistent/catalog.json"))).unwrap_err();
        assert!(err.is_fatal());
    }
}
