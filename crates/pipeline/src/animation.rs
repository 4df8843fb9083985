//! Animation state generation
//!
//! Turns emotion labels, viseme timelines, and named gestures into grouped
//! `Animation` payloads from the static per-character tables. Weights are
//! scaled by intensity and capped at 1.0.

use parla_core::{Animation, AnimationCommand, AnimationType, CharacterId, Emotion, TimedViseme, Viseme};

use crate::characters::CharacterProfile;

/// Named gestures available on every character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Wave,
    Bow,
    Nod,
    Shrug,
}

/// Animation state generator over the static character tables
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationGenerator;

impl AnimationGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Facial animation for an emotion at the given intensity.
    ///
    /// Unknown emotion labels resolve to `Neutral` before lookup, so every
    /// call yields a non-empty command list.
    pub fn emotion_animation(
        &self,
        character_id: CharacterId,
        emotion: Emotion,
        intensity: f32,
    ) -> Animation {
        let intensity = intensity.clamp(0.0, 1.0);
        let profile = CharacterProfile::of(character_id);

        let commands: Vec<AnimationCommand> = profile
            .emotion_commands(emotion)
            .iter()
            .map(|(target, weight, offset, easing)| {
                AnimationCommand::new(*target, (weight * intensity).min(1.0), *offset, *easing)
            })
            .collect();

        let duration_ms = commands
            .iter()
            .map(|c| c.timing_offset_ms + 400)
            .max()
            .unwrap_or(400);

        Animation {
            animation_type: AnimationType::Facial,
            commands,
            duration_ms,
            character_id,
        }
    }

    /// Lip-sync animation from a viseme timeline (see the lipsync module).
    pub fn lip_sync_animation(
        &self,
        character_id: CharacterId,
        visemes: &[TimedViseme],
    ) -> Animation {
        let commands: Vec<AnimationCommand> = visemes
            .iter()
            .map(|v| {
                AnimationCommand::new(
                    viseme_target(v.viseme),
                    v.weight.min(1.0),
                    v.start_ms,
                    parla_core::Easing::EaseOut,
                )
            })
            .collect();

        let duration_ms = visemes.last().map(|v| v.end_ms).unwrap_or(0);

        Animation {
            animation_type: AnimationType::LipSync,
            commands,
            duration_ms,
            character_id,
        }
    }

    /// Named gesture animation from the per-character gesture table.
    pub fn gesture_animation(&self, character_id: CharacterId, gesture: Gesture) -> Animation {
        let profile = CharacterProfile::of(character_id);

        let commands: Vec<AnimationCommand> = profile
            .gesture_commands(gesture)
            .iter()
            .map(|(target, weight, offset, easing)| {
                AnimationCommand::new(*target, *weight, *offset, *easing)
            })
            .collect();

        let duration_ms = commands
            .iter()
            .map(|c| c.timing_offset_ms + 600)
            .max()
            .unwrap_or(600);

        Animation {
            animation_type: AnimationType::Gesture,
            commands,
            duration_ms,
            character_id,
        }
    }
}

/// Blendshape target driven by a viseme
fn viseme_target(viseme: Viseme) -> &'static str {
    match viseme {
        Viseme::Sil => "viseme_sil",
        Viseme::Aa => "viseme_aa",
        Viseme::Ee => "viseme_ee",
        Viseme::Ih => "viseme_ih",
        Viseme::Oh => "viseme_oh",
        Viseme::Ou => "viseme_ou",
        Viseme::Mbp => "viseme_mbp",
        Viseme::Fv => "viseme_fv",
        Viseme::Dd => "viseme_dd",
        Viseme::Kk => "viseme_kk",
        Viseme::Ss => "viseme_ss",
        Viseme::Nn => "viseme_nn",
        Viseme::Rr => "viseme_rr",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipsync;

    #[test]
    fn test_intensity_scales_and_caps() {
        let generator = AnimationGenerator::new();

        let full = generator.emotion_animation(CharacterId::Maria, Emotion::Excited, 1.0);
        let half = generator.emotion_animation(CharacterId::Maria, Emotion::Excited, 0.5);

        for (f, h) in full.commands.iter().zip(&half.commands) {
            assert!((h.weight - f.weight * 0.5).abs() < f32::EPSILON * 4.0);
            assert!(f.weight <= 1.0);
        }

        // Out-of-range intensity is clamped, never amplified past 1.0
        let over = generator.emotion_animation(CharacterId::Maria, Emotion::Excited, 5.0);
        for c in &over.commands {
            assert!(c.weight <= 1.0);
        }
    }

    #[test]
    fn test_unknown_emotion_uses_neutral_table() {
        let generator = AnimationGenerator::new();
        let unknown = generator.emotion_animation(
            CharacterId::Akira,
            Emotion::from_label("melancholy"),
            1.0,
        );
        let neutral = generator.emotion_animation(CharacterId::Akira, Emotion::Neutral, 1.0);
        assert_eq!(unknown.commands, neutral.commands);
    }

    #[test]
    fn test_lip_sync_animation_from_timeline() {
        let generator = AnimationGenerator::new();
        let (_, visemes) = lipsync::build_timeline("hola", 400);

        let animation = generator.lip_sync_animation(CharacterId::Maria, &visemes);

        assert_eq!(animation.animation_type, AnimationType::LipSync);
        assert_eq!(animation.commands.len(), visemes.len());
        assert_eq!(animation.duration_ms, 400);
        assert!(animation.commands.iter().all(|c| c.target.starts_with("viseme_")));
    }

    #[test]
    fn test_gesture_animations_exist_for_all_characters() {
        let generator = AnimationGenerator::new();
        for id in CharacterId::ALL {
            for gesture in [Gesture::Wave, Gesture::Bow, Gesture::Nod, Gesture::Shrug] {
                let animation = generator.gesture_animation(id, gesture);
                assert_eq!(animation.animation_type, AnimationType::Gesture);
                assert!(!animation.commands.is_empty());
            }
        }
    }
}
