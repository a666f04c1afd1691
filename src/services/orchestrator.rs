use crate::error::{ConfigError, RecognitionError};
use crate::models::catalog::CatalogEntry;
use crate::models::config::RegionTuning;
use crate::models::frame::{Fingerprint, Frame};
use crate::models::recognition::{MatchOrigin, MatchTier, RecognitionResult};
use crate::models::region::{RegionId, Resolution};
use crate::services::change_detector;
use crate::services::fingerprint_matcher::match_fingerprint;
use crate::services::fingerprint_store::FingerprintStore;
use crate::services::frame_dump::FrameDump;
use crate::services::ocr::{LanguageConfig, OcrEngine};
use crate::services::text_matcher::{find_best, normalize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Memory of the last processed frame for one target
#[derive(Debug, Clone, Default)]
pub struct DetectionState {
    previous_frame: Option<Frame>,
    previous_region: Option<RegionId>,
    previous_result: RecognitionResult,
    pending: Option<Fingerprint>,
}

impl DetectionState {
    pub fn previous_result(&self) -> &RecognitionResult {
        &self.previous_result
    }

    pub fn has_previous_frame(&self) -> bool {
        self.previous_frame.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn commit(&mut self, frame: Frame, region: &RegionId, result: RecognitionResult) {
        self.previous_frame = Some(frame);
        self.previous_region = Some(region.clone());
        self.previous_result = result;
    }

    fn clear(&mut self) {
        self.previous_frame = None;
        self.previous_region = None;
        self.previous_result = RecognitionResult::none();
        self.pending = None;
    }
}

/// Tiered recognizer for one target: change gate, fingerprint lookup, then
/// OCR with fuzzy catalog matching, learning fingerprints from perfect OCR
/// matches.
pub struct RecognitionOrchestrator {
    target: RegionId,
    entries: Vec<CatalogEntry>,
    regions: Arc<BTreeMap<RegionId, RegionTuning>>,
    store: Arc<FingerprintStore>,
    ocr: Arc<dyn OcrEngine>,
    language: LanguageConfig,
    frame_dump: Option<FrameDump>,
    state: DetectionState,
    ocr_calls: u64,
    fingerprint_lookups: u64,
}

impl RecognitionOrchestrator {
    pub fn new(
        target: RegionId,
        entries: Vec<CatalogEntry>,
        regions: Arc<BTreeMap<RegionId, RegionTuning>>,
        store: Arc<FingerprintStore>,
        ocr: Arc<dyn OcrEngine>,
        language: LanguageConfig,
    ) -> Self {
        Self {
            target,
            entries,
            regions,
            store,
            ocr,
            language,
            frame_dump: None,
            state: DetectionState::default(),
            ocr_calls: 0,
            fingerprint_lookups: 0,
        }
    }

    pub fn with_frame_dump(mut self, frame_dump: FrameDump) -> Self {
        self.frame_dump = Some(frame_dump);
        self
    }

    pub fn target(&self) -> &RegionId {
        &self.target
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// Number of OCR invocations so far
    pub fn ocr_calls(&self) -> u64 {
        self.ocr_calls
    }

    /// Forget the last frame, result and pending fingerprint
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Number of frames compared against the fingerprint store so far
    pub fn fingerprint_lookups(&self) -> u64 {
        self.fingerprint_lookups
    }

    /// Recognize one captured frame of `region`.
    ///
    /// `frame == None` means the region's prerequisite affordance was absent.
    /// State is only updated once every fallible step has succeeded.
    pub fn poll(
        &mut self,
        resolution: Resolution,
        region: &RegionId,
        frame: Option<Frame>,
    ) -> Result<RecognitionResult, RecognitionError> {
        let regions = Arc::clone(&self.regions);
        let tuning = regions
            .get(region)
            .ok_or_else(|| ConfigError::UnknownRegion(region.clone()))?;

        let Some(frame) = frame else {
            self.state.clear();
            return Ok(RecognitionResult::none());
        };

        let same_region = self.state.previous_region.as_ref() == Some(region);
        if same_region && !change_detector::changed(self.state.previous_frame.as_ref(), &frame) {
            return Ok(self.state.previous_result.clone());
        }

        let fingerprint = Fingerprint::from_frame(&frame, tuning.pixelset_threshold);
        let candidates = self.store.get_all(resolution, region);
        self.fingerprint_lookups += 1;
        if let Some(name) = match_fingerprint(
            &fingerprint,
            &candidates,
            tuning.fn_tolerance,
            tuning.fp_tolerance,
            tuning.exhaustive,
        ) {
            debug!(target_id = %self.target, %region, name = %name, "fingerprint hit");
            let result = RecognitionResult::fingerprint(name);
            self.state.pending = None;
            self.state.commit(frame, region, result.clone());
            return Ok(result);
        }

        let density = fingerprint.density(&frame);
        if density < tuning.min_ink_fraction {
            debug!(target_id = %self.target, %region, density, "too little ink for OCR");
            return Ok(self.commit_empty(frame, region));
        }

        if tuning.closed_catalog && !self.entries.is_empty() {
            let names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
            if self.store.has_all_known(resolution, region, &names) {
                debug!(target_id = %self.target, %region, "closed catalog fully learned, skipping OCR");
                return Ok(self.commit_empty(frame, region));
            }
        }

        let ocr_input = frame.binarize_inverted(tuning.ocr_threshold);
        if let Some(dump) = &self.frame_dump {
            dump.save(region, &ocr_input);
        }
        self.ocr_calls += 1;
        let raw_text = self.ocr.recognize(&ocr_input, &self.language)?;

        let (tier, entry) = find_best(
            MatchOrigin::Ocr,
            &raw_text,
            &self.entries,
            |e: &CatalogEntry| e.display_text.as_str(),
            tuning.text_similarity_threshold,
            tuning.exhaustive,
        );
        debug!(target_id = %self.target, %region, raw = %raw_text.trim(), ?tier, "OCR finished");

        let matched = entry.map(|e| e.name.clone());
        let result = match &matched {
            Some(name) => RecognitionResult::ocr(name.clone()),
            None => RecognitionResult::ocr(normalize(&raw_text, true)),
        };

        self.state.pending = Some(fingerprint);
        if let (MatchTier::PerfectMatch, Some(name)) = (tier, &matched) {
            self.learn(resolution, region, name);
        }
        self.state.pending = None;

        self.state.commit(frame, region, result.clone());
        Ok(result)
    }

    fn commit_empty(&mut self, frame: Frame, region: &RegionId) -> RecognitionResult {
        let result = RecognitionResult::none();
        self.state.pending = None;
        self.state.commit(frame, region, result.clone());
        result
    }

    /// Persist the pending fingerprint under `name`
    fn learn(&mut self, resolution: Resolution, region: &RegionId, name: &str) {
        let Some(pending) = self.state.pending.take() else {
            return;
        };
        match self.store.save(resolution, region, name, &pending) {
            Ok(true) => debug!(target_id = %self.target, %region, name, "learned fingerprint"),
            Ok(false) => debug!(target_id = %self.target, %region, name, "fingerprint under pixel floor, not learned"),
            Err(e) => warn!(target_id = %self.target, %region, name, error = %e, "failed to persist fingerprint"),
        }
    }
}
