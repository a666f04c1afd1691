use crate::error::ConfigError;
use crate::models::config::TargetKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Letter rating of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rating {
    S,
    A,
    B,
    C,
    D,
    E,
    #[default]
    #[serde(rename = "-")]
    None,
}

impl Rating {
    /// Weight used for scaling scores
    pub fn value(self) -> u32 {
        match self {
            Rating::S => 32,
            Rating::A => 16,
            Rating::B => 8,
            Rating::C => 4,
            Rating::D => 2,
            Rating::E => 1,
            Rating::None => 0,
        }
    }

    /// Letter for a raw scaling value (0-100), with per-attribute band
    /// cutoffs. Zero means the attribute does not scale at all.
    pub fn from_scaling(attribute: Attribute, value: u32) -> Self {
        if value == 0 {
            return Rating::None;
        }
        let bands = [Rating::E, Rating::D, Rating::C, Rating::B, Rating::A, Rating::S];
        let passed = attribute.cutoffs().iter().filter(|&&c| value >= c).count();
        bands[passed]
    }

    /// Smallest raw scaling value that earns this letter
    pub fn scaling_floor(self, attribute: Attribute) -> u32 {
        let cutoffs = attribute.cutoffs();
        match self {
            Rating::None => 0,
            Rating::E => 1,
            Rating::D => cutoffs[0],
            Rating::C => cutoffs[1],
            Rating::B => cutoffs[2],
            Rating::A => cutoffs[3],
            Rating::S => cutoffs[4],
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Rating::S => "S",
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
            Rating::None => "-",
        }
    }
}

/// Scaling attribute, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Str,
    Dex,
    Int,
    Fai,
    Arc,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Str,
        Attribute::Dex,
        Attribute::Int,
        Attribute::Fai,
        Attribute::Arc,
    ];

    /// Lower bounds of the D, C, B, A and S bands
    fn cutoffs(self) -> [u32; 5] {
        match self {
            Attribute::Str | Attribute::Dex => [15, 30, 45, 60, 75],
            Attribute::Int | Attribute::Fai => [20, 30, 40, 50, 60],
            Attribute::Arc => [10, 20, 40, 60, 80],
        }
    }
}

/// The five scaling attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub struct Stats {
    #[serde(default)]
    pub str: Rating,
    #[serde(default)]
    pub dex: Rating,
    #[serde(default)]
    pub int: Rating,
    #[serde(default)]
    pub fai: Rating,
    #[serde(default)]
    pub arc: Rating,
}

impl Stats {
    pub fn new(str: Rating, dex: Rating, int: Rating, fai: Rating, arc: Rating) -> Self {
        Self {
            str,
            dex,
            int,
            fai,
            arc,
        }
    }

    pub fn as_array(&self) -> [Rating; 5] {
        [self.str, self.dex, self.int, self.fai, self.arc]
    }

    /// Sum of the two highest attribute weights
    pub fn sum_two_best(&self) -> u32 {
        let mut values = self.as_array().map(Rating::value);
        values.sort_unstable_by(|a, b| b.cmp(a));
        values[0] + values[1]
    }
}

/// A selectable character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    #[serde(default)]
    pub armament_types: Vec<String>,
    pub stats: Stats,
}

/// An armament that can appear in the item name box.
///
/// Catalog files may give raw `scaling` values (STR, DEX, INT, FAI, ARC);
/// the letter `stats` are then derived from them on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmamentSpec {
    pub name: String,
    pub armament_type: String,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<[u32; 5]>,
}

impl ArmamentSpec {
    pub fn from_scaling(name: impl Into<String>, armament_type: impl Into<String>, scaling: [u32; 5]) -> Self {
        let mut spec = Self {
            name: name.into(),
            armament_type: armament_type.into(),
            stats: Stats::default(),
            scaling: Some(scaling),
        };
        spec.sync_ratings();
        spec
    }

    /// Recompute the letters from the raw values, when there are any
    pub fn sync_ratings(&mut self) {
        if let Some(values) = self.scaling {
            let [str, dex, int, fai, arc] =
                std::array::from_fn(|i| Rating::from_scaling(Attribute::ALL[i], values[i]));
            self.stats = Stats::new(str, dex, int, fai, arc);
        }
    }

    /// Raw scaling values, falling back to each letter's band floor
    pub fn scaling_values(&self) -> [u32; 5] {
        match self.scaling {
            Some(values) => values,
            None => {
                let ratings = self.stats.as_array();
                std::array::from_fn(|i| ratings[i].scaling_floor(Attribute::ALL[i]))
            }
        }
    }
}

/// A recognizable identity: the key used for fingerprints plus the text OCR
/// is expected to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub display_text: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_text: display_text.into(),
        }
    }
}

/// Menu titles recognized by the menu target
pub const SHOP_TITLE: &str = "SHOP";
pub const BOSS_DROP_TITLE: &str = "DORMANT POWER";

/// Static catalog of everything the recognizers can name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub characters: Vec<CharacterSpec>,
    pub armaments: Vec<ArmamentSpec>,
    pub menu_titles: Vec<String>,
}

impl Catalog {
    /// Load a catalog file; absent sections fall back to the built-in ones
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog: Catalog = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        catalog.armaments.iter_mut().for_each(ArmamentSpec::sync_ratings);
        Ok(catalog)
    }

    /// Identities a target of the given kind can resolve to
    pub fn entries_for(&self, kind: TargetKind) -> Vec<CatalogEntry> {
        match kind {
            TargetKind::Menu => self
                .menu_titles
                .iter()
                .map(|title| CatalogEntry::new(title.clone(), title.clone()))
                .collect(),
            TargetKind::Character => self
                .characters
                .iter()
                .map(|c| CatalogEntry::new(c.name.clone(), c.name.clone()))
                .collect(),
            TargetKind::Item => self
                .armaments
                .iter()
                .map(|a| CatalogEntry::new(a.name.clone(), a.name.clone()))
                .collect(),
        }
    }

    pub fn character(&self, name: &str) -> Option<&CharacterSpec> {
        self.characters.iter().find(|c| c.name == name)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        use Rating::*;

        let character = |name: &str, types: &[&str], stats: Stats| CharacterSpec {
            name: name.to_string(),
            armament_types: types.iter().map(|t| t.to_string()).collect(),
            stats,
        };
        let armament = |name: &str, armament_type: &str, stats: Stats| ArmamentSpec {
            name: name.to_string(),
            armament_type: armament_type.to_string(),
            stats,
            scaling: Option::None,
        };

        Self {
            characters: vec![
                character("WYLDER", &["Greatsword"], Stats::new(A, B, C, C, C)),
                character("GUARDIAN", &["Halberd", "Greatshield"], Stats::new(B, C, D, C, C)),
                character("IRONEYE", &["Bow"], Stats::new(C, A, D, D, B)),
                character("DUCHESS", &["Dagger"], Stats::new(D, A, A, B, D)),
                character(
                    "RAIDER",
                    &["Greataxe", "Great Hammer", "Colossal Weapon"],
                    Stats::new(S, C, D, D, C),
                ),
                character("REVENANT", &[], Stats::new(C, C, B, S, B)),
                character("RECLUSE", &[], Stats::new(D, C, S, S, C)),
                character("EXECUTOR", &["Katana"], Stats::new(C, S, D, D, S)),
            ],
            armaments: vec![
                armament("Duchess' Dagger", "Dagger", Stats::new(E, S, None, None, None)),
                armament("Wylder's Greatsword", "Greatsword", Stats::new(B, C, None, None, None)),
                armament("Executor's Blade", "Katana", Stats::new(E, S, None, None, None)),
                armament("Longsword", "Straight Sword", Stats::new(B, B, None, None, None)),
                armament("Claymore", "Greatsword", Stats::new(B, C, None, None, None)),
                armament("Uchigatana", "Katana", Stats::new(E, S, None, None, None)),
                armament("Moonveil", "Katana", Stats::new(E, A, D, None, None)),
                armament("Rivers Of Blood", "Katana", Stats::new(E, A, None, None, C)),
                armament("Coded Sword", "Straight Sword", Stats::new(None, None, None, S, None)),
                armament("Black Knife", "Dagger", Stats::new(E, A, None, D, None)),
            ],
            menu_titles: vec![SHOP_TITLE.to_string(), BOSS_DROP_TITLE.to_string()],
        }
    }
}
