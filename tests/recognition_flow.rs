use armament_helper_lib::error::{OcrError, RecognitionError};
use armament_helper_lib::models::catalog::Catalog;
use armament_helper_lib::models::config::{AppConfig, RegionTuning, TargetConfig, TargetKind};
use armament_helper_lib::models::frame::Frame;
use armament_helper_lib::models::recognition::{MatchOrigin, RecognitionResult};
use armament_helper_lib::models::region::{RegionId, Resolution};
use armament_helper_lib::services::capture::CaptureSource;
use armament_helper_lib::services::fingerprint_store::FingerprintStore;
use armament_helper_lib::services::labels::TYPE_MATCH_ICON;
use armament_helper_lib::services::ocr::{LanguageConfig, OcrEngine};
use armament_helper_lib::services::perception::MenuState;
use armament_helper_lib::services::polling::RecognitionTracker;
use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CHARACTER_WIDTH: u32 = 64;
const ITEM_WIDTH: u32 = 96;

/// Serves a fixed bright block per region; the character and item crops
/// differ in width so the OCR fake can tell them apart.
struct GameScreen;

impl CaptureSource for GameScreen {
    fn capture_and_crop(
        &self,
        region: &RegionId,
        _tuning: &RegionTuning,
    ) -> Result<Option<(Resolution, Frame)>, RecognitionError> {
        let width = if region.as_str() == RegionId::CHARACTER_NAME {
            CHARACTER_WIDTH
        } else {
            ITEM_WIDTH
        };
        let image = GrayImage::from_fn(width, 16, |x, y| {
            Luma([if (4..width / 2).contains(&x) && (4..12).contains(&y) { 240 } else { 20 }])
        });
        Ok(Some((Resolution::new(1920, 1080), Frame::new(image))))
    }

    fn gate_present(&self, _gate: &str) -> Result<bool, RecognitionError> {
        Ok(false)
    }
}

struct WidthOcr {
    calls: AtomicUsize,
}

impl WidthOcr {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for WidthOcr {
    fn recognize(&self, image: &GrayImage, _language: &LanguageConfig) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.width() == CHARACTER_WIDTH {
            Ok("wylder\n".to_string())
        } else {
            Ok("Claymore".to_string())
        }
    }

    fn name(&self) -> &'static str {
        "width"
    }
}

fn character_target() -> TargetConfig {
    TargetConfig {
        id: RegionId::from(RegionId::CHARACTER_NAME),
        kind: TargetKind::Character,
        period_ms: 5,
        enabled: true,
    }
}

fn item_target() -> TargetConfig {
    TargetConfig {
        id: RegionId::from(RegionId::ITEM_NAME_DEFAULT),
        kind: TargetKind::Item,
        period_ms: 5,
        enabled: true,
    }
}

fn tracker(store_dir: &Path, ocr: &Arc<WidthOcr>) -> RecognitionTracker {
    let config = AppConfig {
        targets: vec![character_target(), item_target()],
        ..AppConfig::default()
    };
    RecognitionTracker::new(
        Arc::new(config),
        Arc::new(Catalog::default()),
        Arc::new(FingerprintStore::load(store_dir).unwrap()),
        Arc::clone(ocr) as Arc<dyn OcrEngine>,
        Arc::new(GameScreen),
    )
}

#[test]
fn test_learned_names_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let ocr = WidthOcr::new();
    let first = tracker(dir.path(), &ocr);
    let mut item_loop = first.build_loop(&item_target());
    let mut character_loop = first.build_loop(&character_target());

    // Items are meaningless until the character is known
    assert_eq!(item_loop.poll_once().unwrap(), None);

    let character = character_loop.poll_once().unwrap().unwrap();
    assert_eq!(character, RecognitionResult::ocr("WYLDER"));

    let item = item_loop.poll_once().unwrap().unwrap();
    assert_eq!(item, RecognitionResult::ocr("Claymore"));
    assert_eq!(ocr.calls(), 2);

    let snapshot = first.snapshot();
    assert_eq!(snapshot.menu_state, MenuState::Default);
    assert_eq!(snapshot.character.as_deref(), Some("WYLDER"));
    let labels = snapshot.item_labels.expect("labels for a known armament");
    assert_eq!(labels.armament, "Claymore");
    assert!(labels.icons.iter().any(|icon| icon == TYPE_MATCH_ICON));

    // A new session over the same fingerprint directory needs no OCR
    let ocr = WidthOcr::new();
    let second = tracker(dir.path(), &ocr);
    let mut character_loop = second.build_loop(&character_target());
    let mut item_loop = second.build_loop(&item_target());

    let character = character_loop.poll_once().unwrap().unwrap();
    assert_eq!(character, RecognitionResult::fingerprint("WYLDER"));
    let item = item_loop.poll_once().unwrap().unwrap();
    assert_eq!(item, RecognitionResult::fingerprint("Claymore"));
    assert_eq!(ocr.calls(), 0);
    assert!(second.snapshot().item_labels.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_loops_share_perception() {
    let dir = tempfile::tempdir().unwrap();
    let ocr = WidthOcr::new();
    let tracker = tracker(dir.path(), &ocr);

    assert_eq!(tracker.start_tracking(), 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    tracker.stop_tracking();
    let summaries = tracker.join().await;

    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.fatal_error.is_none()));
    // Each region reaches OCR once; later frames are unchanged
    assert_eq!(ocr.calls(), 2);

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.character.as_deref(), Some("WYLDER"));
    assert_eq!(
        snapshot.results[&RegionId::from(RegionId::ITEM_NAME_DEFAULT)].origin,
        MatchOrigin::Ocr
    );
    assert_eq!(
        snapshot.item_labels.map(|labels| labels.armament),
        Some("Claymore".to_string())
    );
}
