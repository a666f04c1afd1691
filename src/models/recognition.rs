use serde::{Deserialize, Serialize};

/// How a recognized value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrigin {
    #[default]
    None,
    Fingerprint,
    Ocr,
}

/// Confidence of a fuzzy text comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    NoMatch,
    GoodMatch,
    PerfectMatch,
}

/// Current best-known value of one recognition target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecognitionResult {
    pub origin: MatchOrigin,
    pub value: String,
}

impl RecognitionResult {
    /// Nothing legible
    pub fn none() -> Self {
        Self::default()
    }

    pub fn fingerprint(name: impl Into<String>) -> Self {
        Self {
            origin: MatchOrigin::Fingerprint,
            value: name.into(),
        }
    }

    pub fn ocr(text: impl Into<String>) -> Self {
        Self {
            origin: MatchOrigin::Ocr,
            value: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
