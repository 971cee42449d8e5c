//! Facial-expression categories and the sample / average shapes exchanged with the backend.

use serde::{Deserialize, Serialize};

/// The 7 fixed expression categories reported by the camera-analysis collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// One per-frame sample: a `[0,1]` confidence for each category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExpressionFrame {
    pub neutral: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub fearful: f32,
    pub disgusted: f32,
    pub surprised: f32,
}

impl ExpressionFrame {
    pub fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Neutral => self.neutral,
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Fearful => self.fearful,
            Emotion::Disgusted => self.disgusted,
            Emotion::Surprised => self.surprised,
        }
    }

    pub fn set(&mut self, emotion: Emotion, value: f32) {
        let slot = match emotion {
            Emotion::Neutral => &mut self.neutral,
            Emotion::Happy => &mut self.happy,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Fearful => &mut self.fearful,
            Emotion::Disgusted => &mut self.disgusted,
            Emotion::Surprised => &mut self.surprised,
        };
        *slot = value;
    }
}

/// Session-level averages. Same shape as a frame; a distinct type so the two are not mixed up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExpressionAverages(pub ExpressionFrame);

impl ExpressionAverages {
    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0.get(emotion)
    }

    pub fn is_zero(&self) -> bool {
        Emotion::ALL.iter().all(|e| self.get(*e) == 0.0)
    }
}
