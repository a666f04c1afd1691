use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a screen region / recognition purpose.
///
/// Every identifier owns its own fingerprint cache and its own tuning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub const MENU_TITLE: &'static str = "menu-title";
    pub const CHARACTER_NAME: &'static str = "character-name";
    pub const ITEM_NAME_DEFAULT: &'static str = "item-name-default";
    pub const ITEM_NAME_DEFAULT_REPLACE: &'static str = "item-name-default-replace";
    pub const ITEM_NAME_BOSS_DROP: &'static str = "item-name-boss-drop";
    pub const ITEM_NAME_SHOP: &'static str = "item-name-shop";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Literal capture size. Fingerprints learned at one resolution are never
/// reused at another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse the directory form `"{width}x{height}"`
    pub fn parse(text: &str) -> Option<Self> {
        let (w, h) = text.split_once('x')?;
        Some(Self {
            width: w.parse().ok()?,
            height: h.parse().ok()?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle in relative screen coordinates (0.0 to 1.0), so one box serves
/// every resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RelativeRect {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl RelativeRect {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Validate box dimensions
    pub fn is_valid(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }

    /// Convert to absolute pixels `(x, y, width, height)`, clamped to the
    /// given screen size.
    pub fn to_pixels(&self, screen: Resolution) -> (u32, u32, u32, u32) {
        let w = screen.width;
        let h = screen.height;
        let x0 = ((self.left * w as f32) as u32).min(w);
        let y0 = ((self.top * h as f32) as u32).min(h);
        let x1 = ((self.right * w as f32) as u32).clamp(x0, w);
        let y1 = ((self.bottom * h as f32) as u32).clamp(y0, h);
        (x0, y0, x1 - x0, y1 - y0)
    }
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self::new(0.0, 0.1, 0.0, 0.1)
    }
}
