//! Character and emotion identifiers
//!
//! Characters are a closed roster: adding one means adding a variant and the
//! matching table rows in the pipeline crate, not a new type hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a tutor character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterId {
    /// Spanish tutor
    Maria,
    /// Japanese tutor
    Akira,
    /// French tutor
    Chloe,
}

impl CharacterId {
    /// All known characters
    pub const ALL: [CharacterId; 3] = [CharacterId::Maria, CharacterId::Akira, CharacterId::Chloe];

    /// Stable string id used on the wire and in URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterId::Maria => "maria",
            CharacterId::Akira => "akira",
            CharacterId::Chloe => "chloe",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CharacterId::Maria => "María",
            CharacterId::Akira => "Akira",
            CharacterId::Chloe => "Chloé",
        }
    }

    /// Language taught by this character (BCP 47 primary subtag)
    pub fn default_language(&self) -> &'static str {
        match self {
            CharacterId::Maria => "es",
            CharacterId::Akira => "ja",
            CharacterId::Chloe => "fr",
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown character ids
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown character: {0}")]
pub struct UnknownCharacter(pub String);

impl FromStr for CharacterId {
    type Err = UnknownCharacter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maria" => Ok(CharacterId::Maria),
            "akira" => Ok(CharacterId::Akira),
            "chloe" => Ok(CharacterId::Chloe),
            other => Err(UnknownCharacter(other.to_string())),
        }
    }
}

/// Emotion label attached to a character response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Excited,
    Sad,
    Surprised,
    Thinking,
    Encouraging,
}

impl Emotion {
    /// Stable string label
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Excited => "excited",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
            Emotion::Thinking => "thinking",
            Emotion::Encouraging => "encouraging",
        }
    }

    /// Parse a label, mapping anything unknown to `Neutral`
    pub fn from_label(label: &str) -> Self {
        match label {
            "happy" => Emotion::Happy,
            "excited" => Emotion::Excited,
            "sad" => Emotion::Sad,
            "surprised" => Emotion::Surprised,
            "thinking" => Emotion::Thinking,
            "encouraging" => Emotion::Encouraging,
            _ => Emotion::Neutral,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
