//! Best-guess emotion labeling
//!
//! A tiny keyword/punctuation heuristic over the final response text, used
//! to pick prosody and the facial animation for a turn. No provider call is
//! involved; anything unrecognized is neutral, which the animation tables
//! already treat as a safe default.

use parla_core::Emotion;

const HAPPY_MARKERS: &[&str] = &[
    "great", "genial", "bien hecho", "すごい", "よくできました", "bravo", "super",
];
const EXCITED_MARKERS: &[&str] = &[
    "excelente", "fantástico", "やった", "incroyable", "formidable", "wow",
];
const SAD_MARKERS: &[&str] = &["lo siento", "triste", "残念", "désolé", "désolée", "dommage"];
const ENCOURAGING_MARKERS: &[&str] = &[
    "intenta", "puedes", "頑張", "essaie", "tu peux", "no te preocupes", "大丈夫",
];

/// Guess an emotion label from response text.
pub fn guess_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();

    let contains_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if contains_any(EXCITED_MARKERS) {
        Emotion::Excited
    } else if contains_any(SAD_MARKERS) {
        Emotion::Sad
    } else if contains_any(ENCOURAGING_MARKERS) {
        Emotion::Encouraging
    } else if contains_any(HAPPY_MARKERS) || lower.contains('!') || lower.contains('！') {
        Emotion::Happy
    } else {
        Emotion::Neutral
    }
}
