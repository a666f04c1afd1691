use crate::error::RecognitionError;
use crate::models::config::{TargetConfig, TargetKind, REPLACE_PROMPT_GATE};
use crate::models::region::RegionId;
use crate::services::capture::CaptureSource;
use crate::services::perception::{MenuState, SharedPerception};

/// Chooses which region a target should capture on this iteration
pub trait EffectiveRegionResolver: Send + Sync {
    /// `Ok(None)` skips the poll entirely
    fn resolve(
        &self,
        target: &TargetConfig,
        perception: &SharedPerception,
        capture: &dyn CaptureSource,
    ) -> Result<Option<RegionId>, RecognitionError>;
}

/// Item boxes follow the open menu; other targets capture their own region
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuRegionResolver;

impl EffectiveRegionResolver for MenuRegionResolver {
    fn resolve(
        &self,
        target: &TargetConfig,
        perception: &SharedPerception,
        capture: &dyn CaptureSource,
    ) -> Result<Option<RegionId>, RecognitionError> {
        if target.kind != TargetKind::Item {
            return Ok(Some(target.id.clone()));
        }

        // Labels are per character; nothing to do until one is known
        if perception.current_character().is_none() {
            return Ok(None);
        }

        let region = match perception.menu_state() {
            MenuState::Shop => RegionId::ITEM_NAME_SHOP,
            MenuState::BossDrop => RegionId::ITEM_NAME_BOSS_DROP,
            MenuState::Default => {
                if capture.gate_present(REPLACE_PROMPT_GATE)? {
                    RegionId::ITEM_NAME_DEFAULT_REPLACE
                } else {
                    RegionId::ITEM_NAME_DEFAULT
                }
            }
        };
        Ok(Some(RegionId::from(region)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::RegionTuning;
    use crate::models::frame::Frame;
    use crate::models::recognition::RecognitionResult;
    use crate::models::region::Resolution;
    use crate::services::labels::Labeler;
    use crate::services::perception::ItemLabeling;
    use std::sync::Arc;

    struct GateOnly(bool);

    impl CaptureSource for GateOnly {
        fn capture_and_crop(
            &self,
            _region: &RegionId,
            _tuning: &RegionTuning,
        ) -> Result<Option<(Resolution, Frame)>, RecognitionError> {
            Ok(None)
        }

        fn gate_present(&self, _gate: &str) -> Result<bool, RecognitionError> {
            Ok(self.0)
        }
    }

    fn target(id: &str, kind: TargetKind) -> TargetConfig {
        TargetConfig {
            id: RegionId::from(id),
            kind,
            period_ms: 100,
            enabled: true,
        }
    }

    fn perception_with(character: Option<&str>, menu_title: &str) -> SharedPerception {
        let perception = SharedPerception::new();
        let labeling = ItemLabeling::new(Arc::new(Default::default()), Labeler::default());
        if let Some(name) = character {
            perception.publish(
                &target(RegionId::CHARACTER_NAME, TargetKind::Character),
                RecognitionResult::ocr(name),
                &labeling,
                0.85,
            );
        }
        perception.publish(
            &target(RegionId::MENU_TITLE, TargetKind::Menu),
            RecognitionResult::ocr(menu_title),
            &labeling,
            0.75,
        );
        perception
    }

    fn resolve(perception: &SharedPerception, gate: bool) -> Option<RegionId> {
        MenuRegionResolver
            .resolve(
                &target(RegionId::ITEM_NAME_DEFAULT, TargetKind::Item),
                perception,
                &GateOnly(gate),
            )
            .unwrap()
    }

    #[test]
    fn test_non_item_targets_use_own_region() {
        let perception = SharedPerception::new();
        let menu = target(RegionId::MENU_TITLE, TargetKind::Menu);
        assert_eq!(
            MenuRegionResolver.resolve(&menu, &perception, &GateOnly(false)).unwrap(),
            Some(RegionId::from(RegionId::MENU_TITLE))
        );
    }

    #[test]
    fn test_item_skipped_without_character() {
        assert_eq!(resolve(&perception_with(None, "SHOP"), false), None);
    }

    #[test]
    fn test_item_region_follows_menu() {
        assert_eq!(
            resolve(&perception_with(Some("WYLDER"), "SHOP"), false),
            Some(RegionId::from(RegionId::ITEM_NAME_SHOP))
        );
        assert_eq!(
            resolve(&perception_with(Some("WYLDER"), "DORMANT POWER"), false),
            Some(RegionId::from(RegionId::ITEM_NAME_BOSS_DROP))
        );
        assert_eq!(
            resolve(&perception_with(Some("WYLDER"), ""), false),
            Some(RegionId::from(RegionId::ITEM_NAME_DEFAULT))
        );
        assert_eq!(
            resolve(&perception_with(Some("WYLDER"), ""), true),
            Some(RegionId::from(RegionId::ITEM_NAME_DEFAULT_REPLACE))
        );
    }
}
