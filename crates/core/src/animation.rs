//! Avatar animation types
//!
//! An `Animation` groups timed blendshape/gesture commands for the renderer.
//! Weights are post-scaling values, capped at 1.0.

use serde::{Deserialize, Serialize};

use crate::character::CharacterId;

/// Easing curve applied to a command's weight ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// One command driving a named blendshape or gesture target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationCommand {
    /// Named blendshape or gesture on the avatar mesh
    pub target: String,
    /// Weight in [0, 1] after intensity scaling
    pub weight: f32,
    pub timing_offset_ms: u32,
    pub easing: Easing,
}

impl AnimationCommand {
    pub fn new(target: impl Into<String>, weight: f32, timing_offset_ms: u32, easing: Easing) -> Self {
        Self { target: target.into(), weight, timing_offset_ms, easing }
    }
}

/// Category of an animation payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationType {
    Facial,
    LipSync,
    Body,
    Gesture,
}

/// A grouped animation for one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    #[serde(rename = "type")]
    pub animation_type: AnimationType,
    pub commands: Vec<AnimationCommand>,
    pub duration_ms: u32,
    pub character_id: CharacterId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animation_wire_shape() {
        let animation = Animation {
            animation_type: AnimationType::LipSync,
            commands: vec![AnimationCommand::new("jaw_open", 0.8, 0, Easing::EaseOut)],
            duration_ms: 400,
            character_id: CharacterId::Maria,
        };
        let json = serde_json::to_value(&animation).unwrap();
        assert_eq!(json["type"], "lipSync");
        assert_eq!(json["characterId"], "maria");
        assert_eq!(json["commands"][0]["timingOffsetMs"], 0);
    }
}
