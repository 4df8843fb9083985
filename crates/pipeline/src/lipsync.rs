//! Phoneme/viseme timeline mapping
//!
//! Pure functions: text plus a total duration yield a timed phoneme list and
//! the derived viseme list. Used by both the real and placeholder audio
//! paths, so the lip-sync contract holds even when synthesis is degraded.
//!
//! Allocation is proportional, not acoustic: each word gets an equal slice of
//! the total duration, each character an equal sub-slice of its word.

use parla_core::{TimedPhoneme, TimedViseme, Viseme};

/// Map a character to its phoneme label; anything unmapped is silence.
pub fn phoneme_for_char(c: char) -> &'static str {
    let c = c.to_lowercase().next().unwrap_or(c);
    match c {
        'a' | 'á' | 'à' | 'â' => "a",
        'e' | 'é' | 'è' | 'ê' => "e",
        'i' | 'í' | 'î' | 'y' => "i",
        'o' | 'ó' | 'ô' => "o",
        'u' | 'ú' | 'ù' | 'û' | 'ü' => "u",
        'm' | 'b' | 'p' => "m",
        'f' | 'v' => "f",
        'd' | 't' | 'l' => "d",
        'k' | 'g' | 'c' | 'q' => "k",
        's' | 'z' | 'x' | 'j' => "s",
        'n' | 'ñ' => "n",
        'r' => "r",
        _ => "sil",
    }
}

/// Map a phoneme label to its mouth-shape category.
pub fn viseme_for_phoneme(phoneme: &str) -> Viseme {
    match phoneme {
        "a" => Viseme::Aa,
        "e" => Viseme::Ee,
        "i" => Viseme::Ih,
        "o" => Viseme::Oh,
        "u" => Viseme::Ou,
        "m" => Viseme::Mbp,
        "f" => Viseme::Fv,
        "d" => Viseme::Dd,
        "k" => Viseme::Kk,
        "s" => Viseme::Ss,
        "n" => Viseme::Nn,
        "r" => Viseme::Rr,
        _ => Viseme::Sil,
    }
}

/// Blend weight for a viseme: 1.0 for open/rounded vowels, 0.8 for the
/// mid-strength group, 0.6 otherwise.
pub fn viseme_weight(viseme: Viseme) -> f32 {
    match viseme {
        Viseme::Aa | Viseme::Oh | Viseme::Ou => 1.0,
        Viseme::Ee | Viseme::Ih | Viseme::Mbp => 0.8,
        _ => 0.6,
    }
}

/// Build the phoneme and viseme timelines for an utterance.
///
/// The timelines are time-ordered and non-overlapping; segments that would
/// round to zero length are dropped rather than emitted degenerate.
pub fn build_timeline(text: &str, duration_ms: u32) -> (Vec<TimedPhoneme>, Vec<TimedViseme>) {
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.is_empty() || duration_ms == 0 {
        let end = duration_ms.max(1);
        let phonemes = vec![TimedPhoneme { phoneme: "sil".to_string(), start_ms: 0, end_ms: end }];
        let visemes = vec![TimedViseme {
            viseme: Viseme::Sil,
            start_ms: 0,
            end_ms: end,
            weight: viseme_weight(Viseme::Sil),
        }];
        return (phonemes, visemes);
    }

    let mut phonemes = Vec::new();
    let mut visemes = Vec::new();
    let word_count = words.len() as u64;
    let total = duration_ms as u64;

    for (w, word) in words.iter().enumerate() {
        let word_start = (w as u64 * total) / word_count;
        let word_end = ((w as u64 + 1) * total) / word_count;
        let chars: Vec<char> = word.chars().collect();
        let char_count = chars.len() as u64;
        let word_span = word_end - word_start;

        for (i, c) in chars.iter().enumerate() {
            let start = word_start + (i as u64 * word_span) / char_count;
            let end = word_start + ((i as u64 + 1) * word_span) / char_count;
            if start >= end {
                continue;
            }

            let phoneme = phoneme_for_char(*c);
            let viseme = viseme_for_phoneme(phoneme);
            phonemes.push(TimedPhoneme {
                phoneme: phoneme.to_string(),
                start_ms: start as u32,
                end_ms: end as u32,
            });
            visemes.push(TimedViseme {
                viseme,
                start_ms: start as u32,
                end_ms: end as u32,
                weight: viseme_weight(viseme),
            });
        }
    }

    (phonemes, visemes)
}
