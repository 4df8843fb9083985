//! Static per-character configuration
//!
//! Voice baselines, emotion→animation tables, gesture tables, and fallback
//! phrasebooks, keyed by `CharacterId`. Adding a character means adding a
//! match arm per table, not a new type. Nothing here is mutated at runtime.

use parla_core::{CharacterId, Easing, Emotion, ErrorCategory};
use parla_providers::VoiceConfig;

/// One row of an emotion or gesture table
pub type CommandRow = (&'static str, f32, u32, Easing);

/// Read-only view over a character's static configuration
#[derive(Debug, Clone, Copy)]
pub struct CharacterProfile {
    pub id: CharacterId,
}

impl CharacterProfile {
    pub fn of(id: CharacterId) -> Self {
        Self { id }
    }

    /// Voice baseline plus emotion-keyed prosody deltas
    pub fn voice_config(&self, emotion: Option<Emotion>) -> VoiceConfig {
        let mut config = voice_baseline(self.id);
        if let Some(emotion) = emotion {
            let (speed_delta, expressiveness_delta) = prosody_delta(emotion);
            config.speed = (config.speed + speed_delta).clamp(0.5, 2.0);
            config.expressiveness = (config.expressiveness + expressiveness_delta).clamp(0.0, 1.0);
        }
        config
    }

    /// Blendshape commands for an emotion; unknown labels use the neutral row
    pub fn emotion_commands(&self, emotion: Emotion) -> &'static [CommandRow] {
        emotion_table(self.id, emotion)
    }

    /// Gesture commands, or the character's idle nod when unknown
    pub fn gesture_commands(&self, gesture: super::animation::Gesture) -> &'static [CommandRow] {
        gesture_table(self.id, gesture)
    }

    /// Canned fallback line for an error category, in the character's language
    pub fn fallback_line(&self, category: ErrorCategory) -> &'static str {
        phrasebook(self.id, category)
    }

    /// Reply to an empty message, in the character's language
    pub fn empty_message_line(&self) -> &'static str {
        match self.id {
            CharacterId::Maria => "¿Dijiste algo? ¡No escuché nada!",
            CharacterId::Akira => "何か言いましたか？聞こえませんでした。",
            CharacterId::Chloe => "Tu as dit quelque chose ? Je n'ai rien entendu !",
        }
    }

    /// Reply to an over-long message, in the character's language
    pub fn too_long_line(&self) -> &'static str {
        match self.id {
            CharacterId::Maria => "¡Uf, qué mensaje tan largo! ¿Puedes resumirlo un poco?",
            CharacterId::Akira => "長いメッセージですね。もう少し短くまとめてもらえますか？",
            CharacterId::Chloe => "Oh là là, quel long message ! Tu peux résumer un peu ?",
        }
    }

    /// System prompt for the text provider
    pub fn system_prompt(&self, language: &str) -> String {
        let persona = match self.id {
            CharacterId::Maria => {
                "You are María, a warm and patient Spanish tutor from Sevilla. \
                 You gently correct mistakes and celebrate progress."
            }
            CharacterId::Akira => {
                "You are Akira, a calm and encouraging Japanese tutor from Kyoto. \
                 You keep sentences simple and explain politeness levels."
            }
            CharacterId::Chloe => {
                "You are Chloé, a playful French tutor from Lyon. \
                 You sprinkle in cultural notes and idioms."
            }
        };
        format!(
            "{persona} Reply in the language with code '{language}', \
             keeping answers short and conversational."
        )
    }
}

fn voice_baseline(id: CharacterId) -> VoiceConfig {
    match id {
        CharacterId::Maria => VoiceConfig {
            voice_id: "maria-es".to_string(),
            speed: 1.05,
            expressiveness: 0.6,
            pitch: 1.0,
        },
        CharacterId::Akira => VoiceConfig {
            voice_id: "akira-ja".to_string(),
            speed: 0.95,
            expressiveness: 0.4,
            pitch: -1.0,
        },
        CharacterId::Chloe => VoiceConfig {
            voice_id: "chloe-fr".to_string(),
            speed: 1.0,
            expressiveness: 0.7,
            pitch: 0.5,
        },
    }
}

/// (speed delta, expressiveness delta) applied on top of the baseline
fn prosody_delta(emotion: Emotion) -> (f32, f32) {
    match emotion {
        Emotion::Happy => (0.05, 0.15),
        Emotion::Excited => (0.15, 0.3),
        Emotion::Sad => (-0.15, -0.3),
        Emotion::Surprised => (0.1, 0.2),
        Emotion::Thinking => (-0.05, -0.1),
        Emotion::Encouraging => (0.0, 0.1),
        Emotion::Neutral => (0.0, 0.0),
    }
}

fn emotion_table(id: CharacterId, emotion: Emotion) -> &'static [CommandRow] {
    use Easing::*;

    match (id, emotion) {
        (_, Emotion::Neutral) => &[
            ("brow_relax", 0.3, 0, Linear),
            ("mouth_neutral", 0.4, 0, EaseInOut),
        ],
        (CharacterId::Maria, Emotion::Happy) => &[
            ("mouth_smile", 0.9, 0, EaseOut),
            ("cheek_raise", 0.7, 50, EaseOut),
            ("eye_squint", 0.4, 100, EaseInOut),
        ],
        (CharacterId::Maria, Emotion::Excited) => &[
            ("mouth_smile", 1.0, 0, EaseOut),
            ("brow_up", 0.8, 0, EaseOut),
            ("head_tilt", 0.5, 150, EaseInOut),
        ],
        (CharacterId::Maria, Emotion::Sad) => &[
            ("mouth_frown", 0.6, 0, EaseIn),
            ("brow_sad", 0.7, 100, EaseIn),
        ],
        (CharacterId::Maria, Emotion::Surprised) => &[
            ("brow_up", 1.0, 0, EaseOut),
            ("jaw_open", 0.5, 50, EaseOut),
            ("eye_wide", 0.8, 0, EaseOut),
        ],
        (CharacterId::Maria, Emotion::Thinking) => &[
            ("brow_furrow", 0.5, 0, EaseInOut),
            ("eye_look_up", 0.6, 200, EaseInOut),
        ],
        (CharacterId::Maria, Emotion::Encouraging) => &[
            ("mouth_smile", 0.6, 0, EaseOut),
            ("head_nod", 0.7, 100, EaseInOut),
            ("brow_up", 0.3, 0, EaseOut),
        ],
        (CharacterId::Akira, Emotion::Happy) => &[
            ("mouth_smile", 0.6, 0, EaseInOut),
            ("eye_squint", 0.5, 100, EaseInOut),
        ],
        (CharacterId::Akira, Emotion::Excited) => &[
            ("mouth_smile", 0.8, 0, EaseOut),
            ("brow_up", 0.6, 50, EaseOut),
        ],
        (CharacterId::Akira, Emotion::Sad) => &[
            ("mouth_frown", 0.4, 0, EaseIn),
            ("head_bow", 0.5, 150, EaseIn),
            ("brow_sad", 0.5, 100, EaseIn),
        ],
        (CharacterId::Akira, Emotion::Surprised) => &[
            ("brow_up", 0.8, 0, EaseOut),
            ("eye_wide", 0.6, 0, EaseOut),
        ],
        (CharacterId::Akira, Emotion::Thinking) => &[
            ("brow_furrow", 0.6, 0, EaseInOut),
            ("head_tilt", 0.4, 250, EaseInOut),
            ("eye_close_half", 0.3, 200, EaseInOut),
        ],
        (CharacterId::Akira, Emotion::Encouraging) => &[
            ("mouth_smile", 0.5, 0, EaseInOut),
            ("head_nod", 0.8, 100, EaseInOut),
        ],
        (CharacterId::Chloe, Emotion::Happy) => &[
            ("mouth_smile", 1.0, 0, EaseOut),
            ("cheek_raise", 0.8, 50, EaseOut),
        ],
        (CharacterId::Chloe, Emotion::Excited) => &[
            ("mouth_smile", 1.0, 0, EaseOut),
            ("brow_up", 0.9, 0, EaseOut),
            ("head_shake", 0.4, 200, EaseInOut),
        ],
        (CharacterId::Chloe, Emotion::Sad) => &[
            ("mouth_pout", 0.7, 0, EaseIn),
            ("brow_sad", 0.6, 100, EaseIn),
        ],
        (CharacterId::Chloe, Emotion::Surprised) => &[
            ("brow_up", 1.0, 0, EaseOut),
            ("jaw_open", 0.6, 50, EaseOut),
        ],
        (CharacterId::Chloe, Emotion::Thinking) => &[
            ("brow_furrow", 0.4, 0, EaseInOut),
            ("mouth_pucker", 0.5, 150, EaseInOut),
        ],
        (CharacterId::Chloe, Emotion::Encouraging) => &[
            ("mouth_smile", 0.7, 0, EaseOut),
            ("head_nod", 0.6, 100, EaseInOut),
            ("eye_wink", 0.5, 300, EaseOut),
        ],
    }
}

fn gesture_table(id: CharacterId, gesture: super::animation::Gesture) -> &'static [CommandRow] {
    use super::animation::Gesture;
    use Easing::*;

    match (id, gesture) {
        (_, Gesture::Nod) => &[("head_nod", 0.8, 0, EaseInOut)],
        (CharacterId::Maria, Gesture::Wave) => &[
            ("arm_raise_right", 0.9, 0, EaseOut),
            ("hand_wave", 1.0, 200, EaseInOut),
            ("mouth_smile", 0.6, 0, EaseOut),
        ],
        (CharacterId::Akira, Gesture::Wave) => &[
            ("arm_raise_right", 0.6, 0, EaseInOut),
            ("hand_wave", 0.7, 250, EaseInOut),
        ],
        (CharacterId::Chloe, Gesture::Wave) => &[
            ("arm_raise_right", 1.0, 0, EaseOut),
            ("hand_wave", 1.0, 150, EaseInOut),
            ("eye_wink", 0.5, 400, EaseOut),
        ],
        (CharacterId::Akira, Gesture::Bow) => &[
            ("spine_bend", 0.9, 0, EaseInOut),
            ("head_bow", 1.0, 100, EaseInOut),
        ],
        (_, Gesture::Bow) => &[
            ("spine_bend", 0.5, 0, EaseInOut),
            ("head_bow", 0.6, 100, EaseInOut),
        ],
        (_, Gesture::Shrug) => &[
            ("shoulder_raise", 0.8, 0, EaseOut),
            ("brow_up", 0.5, 50, EaseOut),
        ],
    }
}

fn phrasebook(id: CharacterId, category: ErrorCategory) -> &'static str {
    match (id, category) {
        (CharacterId::Maria, ErrorCategory::ProviderFailure) => {
            "Lo siento, me quedé sin palabras un momento. ¿Me lo repites?"
        }
        (CharacterId::Maria, ErrorCategory::ConnectionIssue) => {
            "Parece que la conexión anda lenta hoy. Intentémoslo otra vez."
        }
        (CharacterId::Maria, ErrorCategory::InputValidation) => {
            "No entendí tu mensaje. ¿Puedes escribirlo de nuevo?"
        }
        (CharacterId::Maria, ErrorCategory::GeneralError) => {
            "¡Ay! Algo salió mal, pero aquí sigo. ¿Continuamos?"
        }
        (CharacterId::Akira, ErrorCategory::ProviderFailure) => {
            "すみません、少し言葉に詰まりました。もう一度お願いします。"
        }
        (CharacterId::Akira, ErrorCategory::ConnectionIssue) => {
            "接続が不安定のようです。もう一度試しましょう。"
        }
        (CharacterId::Akira, ErrorCategory::InputValidation) => {
            "メッセージがよく分かりませんでした。もう一度書いてください。"
        }
        (CharacterId::Akira, ErrorCategory::GeneralError) => {
            "おっと、問題が起きました。でも大丈夫、続けましょう。"
        }
        (CharacterId::Chloe, ErrorCategory::ProviderFailure) => {
            "Désolée, j'ai perdu le fil un instant. Tu peux répéter ?"
        }
        (CharacterId::Chloe, ErrorCategory::ConnectionIssue) => {
            "La connexion fait des siennes. On réessaie ?"
        }
        (CharacterId::Chloe, ErrorCategory::InputValidation) => {
            "Je n'ai pas compris ton message. Tu peux le réécrire ?"
        }
        (CharacterId::Chloe, ErrorCategory::GeneralError) => {
            "Oups, petit souci ! Mais je suis toujours là, on continue ?"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_modulates_prosody() {
        let profile = CharacterProfile::of(CharacterId::Maria);
        let neutral = profile.voice_config(Some(Emotion::Neutral));
        let excited = profile.voice_config(Some(Emotion::Excited));
        let sad = profile.voice_config(Some(Emotion::Sad));

        assert!(excited.speed > neutral.speed);
        assert!(excited.expressiveness > neutral.expressiveness);
        assert!(sad.speed < neutral.speed);
        assert!(sad.expressiveness < neutral.expressiveness);
    }

    #[test]
    fn test_every_character_has_every_emotion_row() {
        for id in CharacterId::ALL {
            let profile = CharacterProfile::of(id);
            for emotion in [
                Emotion::Neutral,
                Emotion::Happy,
                Emotion::Excited,
                Emotion::Sad,
                Emotion::Surprised,
                Emotion::Thinking,
                Emotion::Encouraging,
            ] {
                assert!(
                    !profile.emotion_commands(emotion).is_empty(),
                    "{id} missing {emotion}"
                );
            }
        }
    }

    #[test]
    fn test_every_character_has_every_fallback_line() {
        for id in CharacterId::ALL {
            let profile = CharacterProfile::of(id);
            for category in ErrorCategory::ALL {
                assert!(!profile.fallback_line(category).is_empty());
            }
        }
    }

    #[test]
    fn test_table_weights_within_bounds() {
        for id in CharacterId::ALL {
            let profile = CharacterProfile::of(id);
            for emotion in [Emotion::Happy, Emotion::Sad, Emotion::Excited] {
                for (_, weight, _, _) in profile.emotion_commands(emotion) {
                    assert!((0.0..=1.0).contains(weight));
                }
            }
        }
    }
}
