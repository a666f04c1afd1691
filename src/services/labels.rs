use crate::models::catalog::{ArmamentSpec, Catalog, CharacterSpec, Rating};
use crate::models::recognition::{MatchTier, RecognitionResult};
use crate::services::text_matcher::find_best;
use serde::Serialize;
use std::sync::Arc;

pub const TYPE_MATCH_ICON: &str = "\u{1f9e4}";
pub const GREAT_MATCH_ICON: &str = "\u{2b50}";
pub const DECENT_MATCH_ICON: &str = "\u{2714}";

const GREAT_SCORE: f64 = 0.30;
const DECENT_SCORE: f64 = 0.10;

/// Feedback shown for the currently inspected armament
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemLabels {
    pub armament: String,
    pub icons: Vec<String>,
    pub advanced_text: String,
}

/// Produces label content for a character/armament pair
pub trait LabelExtension: Send + Sync {
    fn name(&self) -> &str;

    fn basic_icons(&self, character: &CharacterSpec, armament: &ArmamentSpec) -> Vec<String>;

    fn advanced_text(&self, character: &CharacterSpec, armament: &ArmamentSpec) -> String;
}

/// How a registered extension composes with the others
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMode {
    /// Replaces the default labeler; the last registered override wins
    Override,
    /// Runs ahead of the primary labeler
    Before,
    /// Runs after the primary labeler
    After,
}

/// Stat-scaling score of an armament for a character, rounded to 2 decimals
pub fn scaling_score(character: &CharacterSpec, armament: &ArmamentSpec) -> f64 {
    let weighted: u32 = character
        .stats
        .as_array()
        .iter()
        .zip(armament.stats.as_array().iter())
        .map(|(c, a)| c.value() * a.value())
        .sum();
    let best = character.stats.sum_two_best();
    if best == 0 {
        return 0.0;
    }
    let score = weighted as f64 / (best as f64 * Rating::S.value() as f64);
    (score * 100.0).round() / 100.0
}

/// Built-in labeler: type match plus scaling quality icons, and the raw
/// scaling letters as advanced text
pub struct DefaultLabeler;

impl LabelExtension for DefaultLabeler {
    fn name(&self) -> &str {
        "default"
    }

    fn basic_icons(&self, character: &CharacterSpec, armament: &ArmamentSpec) -> Vec<String> {
        let mut icons = Vec::new();
        if character.armament_types.contains(&armament.armament_type) {
            icons.push(TYPE_MATCH_ICON.to_string());
        }
        let score = scaling_score(character, armament);
        if score >= GREAT_SCORE {
            icons.push(GREAT_MATCH_ICON.to_string());
        } else if score > DECENT_SCORE {
            icons.push(DECENT_MATCH_ICON.to_string());
        }
        icons
    }

    fn advanced_text(&self, _character: &CharacterSpec, armament: &ArmamentSpec) -> String {
        let letters: Vec<&str> = armament.stats.as_array().iter().map(|r| r.letter()).collect();
        format!("[{}]", letters.join("|"))
    }
}

const TIER_STEP: f64 = 15.0;
const MAX_TIER: f64 = 6.0;
const TIER_LETTERS: [&str; 7] = ["E", "D", "C", "B", "A", "S", "SS"];

/// Overall tier of an armament for a character: the character's attribute
/// letters weight the armament's raw scaling values.
///
/// Only contributes advanced text, e.g. `"A- ( 54.0% )"`.
pub struct WeaponTierExtension;

impl WeaponTierExtension {
    fn character_weight(rating: Rating) -> f64 {
        match rating {
            Rating::S => 100.0,
            Rating::A => 80.0,
            Rating::B => 60.0,
            Rating::C => 40.0,
            Rating::D => 20.0,
            Rating::E | Rating::None => 0.0,
        }
    }

    pub fn total(character: &CharacterSpec, armament: &ArmamentSpec) -> f64 {
        character
            .stats
            .as_array()
            .iter()
            .zip(armament.scaling_values())
            .map(|(&rating, value)| Self::character_weight(rating) * value as f64 / 100.0)
            .sum()
    }

    pub fn tier(total: f64) -> String {
        let exact = (total / TIER_STEP).min(MAX_TIER);
        let whole = exact.round_ties_even();
        let mut letter = TIER_LETTERS[whole.max(0.0) as usize].to_string();
        let rest = exact - whole;
        if rest <= -0.25 {
            letter.push('-');
        } else if rest >= 0.25 {
            letter.push('+');
        }
        letter
    }
}

impl LabelExtension for WeaponTierExtension {
    fn name(&self) -> &str {
        "weapon_tier"
    }

    fn basic_icons(&self, _character: &CharacterSpec, _armament: &ArmamentSpec) -> Vec<String> {
        Vec::new()
    }

    fn advanced_text(&self, character: &CharacterSpec, armament: &ArmamentSpec) -> String {
        let total = Self::total(character, armament);
        format!("{} ( {:.1}% )", Self::tier(total), total)
    }
}

/// Extensions registered at startup, resolved once into a fixed chain
#[derive(Default)]
pub struct ExtensionRegistry {
    overrides: Vec<Arc<dyn LabelExtension>>,
    befores: Vec<Arc<dyn LabelExtension>>,
    afters: Vec<Arc<dyn LabelExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mode: ExtensionMode, extension: Arc<dyn LabelExtension>) {
        match mode {
            ExtensionMode::Override => self.overrides.push(extension),
            ExtensionMode::Before => self.befores.push(extension),
            ExtensionMode::After => self.afters.push(extension),
        }
    }

    /// `befores ++ [last override or default] ++ afters`
    pub fn resolve(&self) -> Labeler {
        let primary = self
            .overrides
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::new(DefaultLabeler) as Arc<dyn LabelExtension>);

        let chain = self
            .befores
            .iter()
            .cloned()
            .chain(std::iter::once(primary))
            .chain(self.afters.iter().cloned())
            .collect();
        Labeler { chain }
    }
}

/// Resolved extension chain
#[derive(Clone)]
pub struct Labeler {
    chain: Vec<Arc<dyn LabelExtension>>,
}

impl Default for Labeler {
    fn default() -> Self {
        ExtensionRegistry::new().resolve()
    }
}

impl Labeler {
    pub fn extension_names(&self) -> Vec<&str> {
        self.chain.iter().map(|e| e.name()).collect()
    }

    pub fn label(&self, character: &CharacterSpec, armament: &ArmamentSpec) -> ItemLabels {
        let icons = self
            .chain
            .iter()
            .flat_map(|e| e.basic_icons(character, armament))
            .collect();
        let advanced_text = self
            .chain
            .iter()
            .map(|e| e.advanced_text(character, armament))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        ItemLabels {
            armament: armament.name.clone(),
            icons,
            advanced_text,
        }
    }

    /// Labels for a recognized item name, or `None` when the character is
    /// unknown or the item does not resolve to a catalog armament
    pub fn labels_for(
        &self,
        catalog: &Catalog,
        character: &str,
        item: &RecognitionResult,
        threshold: f64,
    ) -> Option<ItemLabels> {
        let character = catalog.character(character)?;
        let (tier, armament) = find_best(
            item.origin,
            &item.value,
            &catalog.armaments,
            |a: &ArmamentSpec| a.name.as_str(),
            threshold,
            true,
        );
        match (tier, armament) {
            (MatchTier::NoMatch, _) | (_, None) => None,
            (_, Some(armament)) => Some(self.label(character, armament)),
        }
    }
}
