//! Audio timeline types
//!
//! An `AudioResult` pairs an audio artifact with the phoneme/viseme timing
//! used to drive lip-sync. Timelines are time-ordered and non-overlapping
//! within a single utterance; viseme weights are bounded to [0, 1].

use serde::{Deserialize, Serialize};

/// Reference to a synthesized audio artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioRef {
    /// Static URL under the server's audio path prefix
    Url(String),
    /// Raw audio bytes (placeholder path before the artifact is written)
    Buffer(Vec<u8>),
}

impl AudioRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            AudioRef::Url(url) => Some(url),
            AudioRef::Buffer(_) => None,
        }
    }
}

/// A phoneme occupying a slice of the utterance timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedPhoneme {
    pub phoneme: String,
    pub start_ms: u32,
    pub end_ms: u32,
}

/// Mouth-shape category derived from a phoneme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viseme {
    /// Mouth closed / silence
    Sil,
    /// Open vowel (a)
    Aa,
    /// Spread vowel (e)
    Ee,
    /// Narrow vowel (i)
    Ih,
    /// Rounded vowel (o)
    Oh,
    /// Rounded vowel (u)
    Ou,
    /// Bilabial closure (m, b, p)
    Mbp,
    /// Labiodental (f, v)
    Fv,
    /// Tongue tip (d, t, l)
    Dd,
    /// Back consonant (k, g)
    Kk,
    /// Sibilant (s, z, sh)
    Ss,
    /// Nasal (n)
    Nn,
    /// Rhotic (r)
    Rr,
}

/// A viseme occupying a slice of the utterance timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedViseme {
    pub viseme: Viseme,
    pub start_ms: u32,
    pub end_ms: u32,
    /// Blend weight in [0, 1]
    pub weight: f32,
}

/// Synthesized speech plus its lip-sync timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResult {
    pub audio: AudioRef,
    pub duration_ms: u32,
    pub phonemes: Vec<TimedPhoneme>,
    pub visemes: Vec<TimedViseme>,
}

impl AudioResult {
    /// Check the timeline invariants: ordered, non-overlapping, bounded weights.
    pub fn is_well_formed(&self) -> bool {
        let phonemes_ok = self
            .phonemes
            .windows(2)
            .all(|w| w[0].end_ms <= w[1].start_ms)
            && self.phonemes.iter().all(|p| p.start_ms < p.end_ms);

        let visemes_ok = self
            .visemes
            .windows(2)
            .all(|w| w[0].end_ms <= w[1].start_ms)
            && self
                .visemes
                .iter()
                .all(|v| v.start_ms < v.end_ms && (0.0..=1.0).contains(&v.weight));

        phonemes_ok && visemes_ok
    }
}
