use crate::error::{ConfigError, RecognitionError};
use crate::models::catalog::Catalog;
use crate::models::config::{AppConfig, RegionTuning, TargetConfig};
use crate::models::recognition::RecognitionResult;
use crate::models::region::{RegionId, Resolution};
use crate::services::capture::CaptureSource;
use crate::services::fingerprint_store::FingerprintStore;
use crate::services::frame_dump::FrameDump;
use crate::services::labels::Labeler;
use crate::services::ocr::{LanguageConfig, OcrEngine};
use crate::services::orchestrator::RecognitionOrchestrator;
use crate::services::perception::{ItemLabeling, PerceptionSnapshot, SharedPerception};
use crate::services::region_resolver::{EffectiveRegionResolver, MenuRegionResolver};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// What a finished loop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub target: RegionId,
    pub polls: u64,
    pub ocr_calls: u64,
    /// Set when the loop stopped on an unrecoverable error
    pub fatal_error: Option<String>,
}

/// Periodic recognition of one target
pub struct PollingLoop {
    target: TargetConfig,
    orchestrator: RecognitionOrchestrator,
    capture: Arc<dyn CaptureSource>,
    resolver: Arc<dyn EffectiveRegionResolver>,
    regions: Arc<BTreeMap<RegionId, RegionTuning>>,
    perception: Arc<SharedPerception>,
    labeling: Arc<ItemLabeling>,
    stop_signal: Arc<AtomicBool>,
    enabled: Arc<AtomicBool>,
    polls: u64,
}

impl PollingLoop {
    /// Capture, recognize and publish once. Blocking.
    ///
    /// Returns `Ok(None)` when the resolver skipped this iteration.
    pub fn poll_once(&mut self) -> Result<Option<RecognitionResult>, RecognitionError> {
        let Some(region) = self
            .resolver
            .resolve(&self.target, &self.perception, self.capture.as_ref())?
        else {
            debug!(target_id = %self.target.id, "nothing to capture");
            return Ok(None);
        };

        let tuning = self
            .regions
            .get(&region)
            .ok_or_else(|| ConfigError::UnknownRegion(region.clone()))?;
        let text_threshold = tuning.text_similarity_threshold;

        let result = match self.capture.capture_and_crop(&region, tuning)? {
            Some((resolution, frame)) => self.orchestrator.poll(resolution, &region, Some(frame))?,
            None => self.orchestrator.poll(Resolution::new(0, 0), &region, None)?,
        };
        self.polls += 1;

        self.perception
            .publish(&self.target, result.clone(), &self.labeling, text_threshold);
        Ok(Some(result))
    }

    fn summary(&self, fatal_error: Option<String>) -> LoopSummary {
        LoopSummary {
            target: self.target.id.clone(),
            polls: self.polls,
            ocr_calls: self.orchestrator.ocr_calls(),
            fatal_error,
        }
    }

    /// Poll until the stop signal is raised, one iteration per period
    /// (measured start to start). Each iteration runs on the blocking pool.
    pub async fn run(self) -> LoopSummary {
        let period = Duration::from_millis(self.target.period_ms);
        let target_id = self.target.id.clone();
        let stop_signal = Arc::clone(&self.stop_signal);
        let enabled = Arc::clone(&self.enabled);
        info!(target_id = %target_id, period_ms = self.target.period_ms, "recognition loop started");

        let mut looper = self;
        let mut fatal_error = None;
        let mut paused = false;

        while !stop_signal.load(Ordering::SeqCst) {
            let start = Instant::now();

            if !enabled.load(Ordering::SeqCst) {
                if !paused {
                    // Resuming starts from a clean slate
                    looper.orchestrator.reset();
                    info!(target_id = %target_id, "recognition loop paused");
                    paused = true;
                }
                sleep(period).await;
                continue;
            }
            if paused {
                info!(target_id = %target_id, "recognition loop resumed");
                paused = false;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let outcome = looper.poll_once();
                (looper, outcome)
            })
            .await;

            let (returned, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!(target_id = %target_id, error = %e, "recognition task panicked");
                    return LoopSummary {
                        target: target_id,
                        polls: 0,
                        ocr_calls: 0,
                        fatal_error: Some(e.to_string()),
                    };
                }
            };
            looper = returned;

            match outcome {
                Ok(Some(result)) => {
                    debug!(
                        target_id = %target_id,
                        origin = ?result.origin,
                        value = %result.value,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "poll finished"
                    );
                }
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    error!(target_id = %target_id, error = %e, "recognition loop stopped");
                    fatal_error = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    warn!(target_id = %target_id, error = %e, "poll failed");
                }
            }

            sleep(period.saturating_sub(start.elapsed())).await;
        }

        info!(target_id = %target_id, "recognition loop stopped");
        looper.summary(fatal_error)
    }
}

/// Owns every recognition loop and the state they share
pub struct RecognitionTracker {
    config: Arc<AppConfig>,
    regions: Arc<BTreeMap<RegionId, RegionTuning>>,
    catalog: Arc<Catalog>,
    store: Arc<FingerprintStore>,
    ocr: Arc<dyn OcrEngine>,
    capture: Arc<dyn CaptureSource>,
    resolver: Arc<dyn EffectiveRegionResolver>,
    labeling: Arc<ItemLabeling>,
    perception: Arc<SharedPerception>,
    stop_signal: Arc<AtomicBool>,
    switches: BTreeMap<RegionId, Arc<AtomicBool>>,
    handles: parking_lot::Mutex<Vec<JoinHandle<LoopSummary>>>,
}

impl RecognitionTracker {
    pub fn new(
        config: Arc<AppConfig>,
        catalog: Arc<Catalog>,
        store: Arc<FingerprintStore>,
        ocr: Arc<dyn OcrEngine>,
        capture: Arc<dyn CaptureSource>,
    ) -> Self {
        let labeling = Arc::new(ItemLabeling::new(Arc::clone(&catalog), Labeler::default()));
        let switches = config
            .targets
            .iter()
            .map(|t| (t.id.clone(), Arc::new(AtomicBool::new(true))))
            .collect();
        Self {
            regions: Arc::new(config.regions.clone()),
            config,
            catalog,
            store,
            ocr,
            capture,
            resolver: Arc::new(MenuRegionResolver),
            labeling,
            perception: Arc::new(SharedPerception::new()),
            stop_signal: Arc::new(AtomicBool::new(false)),
            switches,
            handles: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EffectiveRegionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_labeler(mut self, labeler: Labeler) -> Self {
        self.labeling = Arc::new(ItemLabeling::new(Arc::clone(&self.catalog), labeler));
        self
    }

    pub fn perception(&self) -> &Arc<SharedPerception> {
        &self.perception
    }

    /// Build the loop for one target without starting it
    pub fn build_loop(&self, target: &TargetConfig) -> PollingLoop {
        let mut orchestrator = RecognitionOrchestrator::new(
            target.id.clone(),
            self.catalog.entries_for(target.kind),
            Arc::clone(&self.regions),
            Arc::clone(&self.store),
            Arc::clone(&self.ocr),
            LanguageConfig::from(&self.config.ocr),
        );
        if self.config.debug.dump_frames {
            orchestrator = orchestrator.with_frame_dump(FrameDump::in_temp_dir());
        }

        PollingLoop {
            target: target.clone(),
            orchestrator,
            capture: Arc::clone(&self.capture),
            resolver: Arc::clone(&self.resolver),
            regions: Arc::clone(&self.regions),
            perception: Arc::clone(&self.perception),
            labeling: Arc::clone(&self.labeling),
            stop_signal: Arc::clone(&self.stop_signal),
            enabled: self
                .switches
                .get(&target.id)
                .cloned()
                .unwrap_or_else(|| Arc::new(AtomicBool::new(true))),
            polls: 0,
        }
    }

    pub fn is_tracking(&self) -> bool {
        !self.handles.lock().is_empty() && !self.stop_signal.load(Ordering::SeqCst)
    }

    /// Spawn one task per enabled target. Must be called inside a tokio
    /// runtime. Returns the number of loops started.
    pub fn start_tracking(&self) -> usize {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("already tracking, ignoring restart request");
            return 0;
        }

        self.stop_signal.store(false, Ordering::SeqCst);
        for target in self.config.targets.iter().filter(|t| t.enabled) {
            let polling_loop = self.build_loop(target);
            handles.push(tokio::spawn(polling_loop.run()));
        }

        info!(loops = handles.len(), "recognition tracker started");
        handles.len()
    }

    /// Ask every loop to stop at its next iteration boundary
    pub fn stop_tracking(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        info!("recognition tracker stopping");
    }

    /// Pause or resume the loop of one configured target. Takes effect at
    /// the loop's next iteration; a paused loop forgets its last frame.
    ///
    /// Returns `false` for targets missing from the configuration.
    pub fn set_target_enabled(&self, target: &RegionId, enabled: bool) -> bool {
        match self.switches.get(target) {
            Some(switch) => {
                switch.store(enabled, Ordering::SeqCst);
                info!(target_id = %target, enabled, "target toggled");
                true
            }
            None => {
                warn!(target_id = %target, "cannot toggle unknown target");
                false
            }
        }
    }

    /// Pause or resume every loop at once
    pub fn set_all_enabled(&self, enabled: bool) {
        for switch in self.switches.values() {
            switch.store(enabled, Ordering::SeqCst);
        }
        info!(enabled, "all targets toggled");
    }

    pub fn is_target_enabled(&self, target: &RegionId) -> Option<bool> {
        self.switches.get(target).map(|s| s.load(Ordering::SeqCst))
    }

    /// Pick the current character by hand; `None` clears it
    pub fn select_character(&self, character: Option<String>) {
        self.perception.set_character(character);
    }

    /// Wait for every loop to finish
    pub async fn join(&self) -> Vec<LoopSummary> {
        let handles = std::mem::take(&mut *self.handles.lock());
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(error = %e, "recognition loop task failed"),
            }
        }
        summaries
    }

    pub fn snapshot(&self) -> PerceptionSnapshot {
        self.perception.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::models::config::TargetKind;
    use crate::models::frame::Frame;
    use crate::models::recognition::MatchOrigin;
    use image::{GrayImage, Luma};
    use std::sync::atomic::AtomicUsize;

    /// Same bright block for every region
    struct StaticCapture;

    impl CaptureSource for StaticCapture {
        fn capture_and_crop(
            &self,
            _region: &RegionId,
            _tuning: &RegionTuning,
        ) -> Result<Option<(Resolution, Frame)>, RecognitionError> {
            let image = GrayImage::from_fn(64, 16, |x, y| {
                Luma([if x < 20 && (4..12).contains(&y) { 240 } else { 20 }])
            });
            Ok(Some((Resolution::new(1920, 1080), Frame::new(image))))
        }

        fn gate_present(&self, _gate: &str) -> Result<bool, RecognitionError> {
            Ok(false)
        }
    }

    struct FixedOcr {
        text: &'static str,
        calls: AtomicUsize,
    }

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image: &GrayImage, _language: &LanguageConfig) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn config_with(targets: Vec<TargetConfig>) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            targets,
            ..AppConfig::default()
        })
    }

    fn tracker(
        config: Arc<AppConfig>,
        text: &'static str,
    ) -> (tempfile::TempDir, Arc<FixedOcr>, RecognitionTracker) {
        let dir = tempfile::tempdir().unwrap();
        let ocr = Arc::new(FixedOcr {
            text,
            calls: AtomicUsize::new(0),
        });
        let tracker = RecognitionTracker::new(
            config,
            Arc::new(Catalog::default()),
            Arc::new(FingerprintStore::empty(dir.path())),
            Arc::clone(&ocr) as Arc<dyn OcrEngine>,
            Arc::new(StaticCapture),
        );
        (dir, ocr, tracker)
    }

    fn character_target(period_ms: u64) -> TargetConfig {
        TargetConfig {
            id: RegionId::from(RegionId::CHARACTER_NAME),
            kind: TargetKind::Character,
            period_ms,
            enabled: true,
        }
    }

    #[test]
    fn test_poll_once_publishes_character() {
        let (_dir, _ocr, tracker) = tracker(config_with(vec![character_target(10)]), "WYLDER");
        let mut polling_loop = tracker.build_loop(&character_target(10));

        let result = polling_loop.poll_once().unwrap().unwrap();
        assert_eq!(result, RecognitionResult::ocr("WYLDER"));
        assert_eq!(tracker.snapshot().character.as_deref(), Some("WYLDER"));
    }

    #[test]
    fn test_item_loop_waits_for_character() {
        let item = TargetConfig {
            id: RegionId::from(RegionId::ITEM_NAME_DEFAULT),
            kind: TargetKind::Item,
            period_ms: 10,
            enabled: true,
        };
        let (_dir, ocr, tracker) = tracker(config_with(vec![item.clone()]), "Longsword");
        let mut polling_loop = tracker.build_loop(&item);

        assert_eq!(polling_loop.poll_once().unwrap(), None);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loop_stops_on_signal() {
        let (_dir, ocr, tracker) = tracker(config_with(vec![character_target(5)]), "DUCHESS");

        assert_eq!(tracker.start_tracking(), 1);
        assert!(tracker.is_tracking());
        // Second start is ignored
        assert_eq!(tracker.start_tracking(), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        tracker.stop_tracking();
        let summaries = tracker.join().await;

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].polls >= 1);
        assert!(summaries[0].fatal_error.is_none());
        // Unchanged frames after the first poll never reach OCR
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.character.as_deref(), Some("DUCHESS"));
        assert_eq!(
            snapshot.results[&RegionId::from(RegionId::CHARACTER_NAME)].origin,
            MatchOrigin::Ocr
        );
    }

    #[tokio::test]
    async fn test_unknown_region_stops_loop() {
        let bogus = TargetConfig {
            id: RegionId::from("nowhere"),
            kind: TargetKind::Menu,
            period_ms: 5,
            enabled: true,
        };
        let (_dir, _ocr, tracker) = tracker(config_with(vec![bogus]), "SHOP");

        tracker.start_tracking();
        let summaries = tracker.join().await;
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].fatal_error.is_some());
    }

    #[tokio::test]
    async fn test_paused_target_does_not_poll() {
        let character = RegionId::from(RegionId::CHARACTER_NAME);
        let (_dir, ocr, tracker) = tracker(config_with(vec![character_target(5)]), "DUCHESS");

        assert!(tracker.set_target_enabled(&character, false));
        assert_eq!(tracker.is_target_enabled(&character), Some(false));
        assert!(!tracker.set_target_enabled(&RegionId::from("nowhere"), false));

        tracker.start_tracking();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        assert!(tracker.snapshot().character.is_none());

        tracker.set_all_enabled(true);
        tokio::time::sleep(Duration::from_millis(60)).await;
        tracker.stop_tracking();
        let summaries = tracker.join().await;

        assert!(summaries[0].polls >= 1);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.snapshot().character.as_deref(), Some("DUCHESS"));
    }

    #[test]
    fn test_manual_character_unblocks_items() {
        let item = TargetConfig {
            id: RegionId::from(RegionId::ITEM_NAME_DEFAULT),
            kind: TargetKind::Item,
            period_ms: 10,
            enabled: true,
        };
        let (_dir, ocr, tracker) = tracker(config_with(vec![item.clone()]), "Longsword");
        let mut polling_loop = tracker.build_loop(&item);

        tracker.select_character(Some("GUARDIAN".to_string()));
        let result = polling_loop.poll_once().unwrap().unwrap();
        assert_eq!(result, RecognitionResult::ocr("Longsword"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.snapshot().item_labels.unwrap().armament, "Longsword");

        tracker.select_character(None);
        assert_eq!(polling_loop.poll_once().unwrap(), None);
    }

    #[test]
    fn test_disabled_targets_not_started() {
        let mut disabled = character_target(10);
        disabled.enabled = false;
        let (_dir, _ocr, tracker) = tracker(config_with(vec![disabled]), "WYLDER");

        let started = tokio_test::block_on(async { tracker.start_tracking() });
        assert_eq!(started, 0);
    }
}
