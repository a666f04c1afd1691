use crate::models::catalog::{Catalog, BOSS_DROP_TITLE, SHOP_TITLE};
use crate::models::config::{TargetConfig, TargetKind};
use crate::models::recognition::RecognitionResult;
use crate::models::region::RegionId;
use crate::services::labels::{ItemLabels, Labeler};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Which menu is on screen, as read from the menu title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MenuState {
    #[default]
    Default,
    Shop,
    BossDrop,
}

impl MenuState {
    pub fn from_title(title: &str) -> Self {
        match title {
            SHOP_TITLE => Self::Shop,
            BOSS_DROP_TITLE => Self::BossDrop,
            _ => Self::Default,
        }
    }
}

/// Point-in-time copy of everything the recognizers know
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerceptionSnapshot {
    pub results: BTreeMap<RegionId, RecognitionResult>,
    pub menu_state: MenuState,
    pub character: Option<String>,
    pub item_labels: Option<ItemLabels>,
}

/// Catalog and labeler used to turn item names into labels
#[derive(Clone)]
pub struct ItemLabeling {
    pub catalog: Arc<Catalog>,
    pub labeler: Labeler,
}

impl ItemLabeling {
    pub fn new(catalog: Arc<Catalog>, labeler: Labeler) -> Self {
        Self { catalog, labeler }
    }
}

/// Cross-target state written by the polling loops.
///
/// One lock per field; readers may observe values from different polls.
#[derive(Debug, Default)]
pub struct SharedPerception {
    menu_state: Mutex<MenuState>,
    character: Mutex<Option<String>>,
    results: Mutex<BTreeMap<RegionId, RecognitionResult>>,
    item_labels: Mutex<Option<ItemLabels>>,
}

impl SharedPerception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu_state(&self) -> MenuState {
        *self.menu_state.lock()
    }

    pub fn current_character(&self) -> Option<String> {
        self.character.lock().clone()
    }

    pub fn result(&self, target: &RegionId) -> Option<RecognitionResult> {
        self.results.lock().get(target).cloned()
    }

    pub fn item_labels(&self) -> Option<ItemLabels> {
        self.item_labels.lock().clone()
    }

    /// Override the current character; `None` or an empty name clears it
    pub fn set_character(&self, name: Option<String>) {
        let name = name.filter(|n| !n.trim().is_empty());
        info!(character = ?name, "character set manually");
        *self.character.lock() = name;
    }

    /// Fold one poll result of `target` into the shared state
    pub fn publish(
        &self,
        target: &TargetConfig,
        result: RecognitionResult,
        labeling: &ItemLabeling,
        text_threshold: f64,
    ) {
        match target.kind {
            TargetKind::Menu => {
                let state = MenuState::from_title(&result.value);
                let mut menu_state = self.menu_state.lock();
                if *menu_state != state {
                    debug!(?state, "menu changed");
                    *menu_state = state;
                }
            }
            TargetKind::Character => {
                // An illegible name keeps the last known character
                if !result.is_empty() {
                    let mut character = self.character.lock();
                    if character.as_deref() != Some(result.value.as_str()) {
                        info!(character = %result.value, "character selected");
                        *character = Some(result.value.clone());
                    }
                }
            }
            TargetKind::Item => {
                let labels = self.current_character().and_then(|character| {
                    labeling
                        .labeler
                        .labels_for(&labeling.catalog, &character, &result, text_threshold)
                });
                *self.item_labels.lock() = labels;
            }
        }

        self.results.lock().insert(target.id.clone(), result);
    }

    pub fn snapshot(&self) -> PerceptionSnapshot {
        PerceptionSnapshot {
            results: self.results.lock().clone(),
            menu_state: self.menu_state(),
            character: self.current_character(),
            item_labels: self.item_labels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, kind: TargetKind) -> TargetConfig {
        TargetConfig {
            id: RegionId::from(id),
            kind,
            period_ms: 100,
            enabled: true,
        }
    }

    fn labeling() -> ItemLabeling {
        ItemLabeling::new(Arc::new(Catalog::default()), Labeler::default())
    }

    #[test]
    fn test_menu_state_from_title() {
        assert_eq!(MenuState::from_title("SHOP"), MenuState::Shop);
        assert_eq!(MenuState::from_title("DORMANT POWER"), MenuState::BossDrop);
        assert_eq!(MenuState::from_title(""), MenuState::Default);
    }

    #[test]
    fn test_character_only_overwritten_by_non_empty() {
        let perception = SharedPerception::new();
        let character = target(RegionId::CHARACTER_NAME, TargetKind::Character);

        perception.publish(&character, RecognitionResult::ocr("WYLDER"), &labeling(), 0.85);
        perception.publish(&character, RecognitionResult::none(), &labeling(), 0.85);
        assert_eq!(perception.current_character().as_deref(), Some("WYLDER"));

        let snapshot = perception.snapshot();
        assert_eq!(
            snapshot.results[&RegionId::from(RegionId::CHARACTER_NAME)],
            RecognitionResult::none()
        );
    }

    #[test]
    fn test_manual_character_selection() {
        let perception = SharedPerception::new();
        let character = target(RegionId::CHARACTER_NAME, TargetKind::Character);

        perception.set_character(Some("RECLUSE".to_string()));
        assert_eq!(perception.current_character().as_deref(), Some("RECLUSE"));

        // Detection still wins when it reads a name
        perception.publish(&character, RecognitionResult::ocr("WYLDER"), &labeling(), 0.85);
        assert_eq!(perception.current_character().as_deref(), Some("WYLDER"));

        perception.set_character(Some("  ".to_string()));
        assert!(perception.current_character().is_none());
        perception.set_character(Some("DUCHESS".to_string()));
        perception.set_character(None);
        assert!(perception.current_character().is_none());
    }

    #[test]
    fn test_menu_results_drive_menu_state() {
        let perception = SharedPerception::new();
        let menu = target(RegionId::MENU_TITLE, TargetKind::Menu);

        perception.publish(&menu, RecognitionResult::fingerprint("SHOP"), &labeling(), 0.75);
        assert_eq!(perception.menu_state(), MenuState::Shop);

        perception.publish(&menu, RecognitionResult::none(), &labeling(), 0.75);
        assert_eq!(perception.menu_state(), MenuState::Default);
    }

    #[test]
    fn test_item_labels_need_character() {
        let perception = SharedPerception::new();
        let item = target(RegionId::ITEM_NAME_DEFAULT, TargetKind::Item);
        let character = target(RegionId::CHARACTER_NAME, TargetKind::Character);

        perception.publish(&item, RecognitionResult::ocr("Duchess' Dagger"), &labeling(), 0.85);
        assert!(perception.item_labels().is_none());

        perception.publish(&character, RecognitionResult::ocr("DUCHESS"), &labeling(), 0.85);
        perception.publish(&item, RecognitionResult::ocr("Duchess' Dagger"), &labeling(), 0.85);
        let labels = perception.item_labels().unwrap();
        assert_eq!(labels.armament, "Duchess' Dagger");

        perception.publish(&item, RecognitionResult::none(), &labeling(), 0.85);
        assert!(perception.item_labels().is_none());
    }
}
