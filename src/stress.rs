//! Fusion of facial apertures and emotion into a stress assessment.
//!
//! The value is `exp(-(eye + lip) / 2)` over raw pixel apertures, so it is
//! not scale invariant: the same face photographed at a different resolution
//! or distance scores differently.

use crate::constants::{
    HIGH_STRESS_THRESHOLD, MIN_FACE_STRESS_VALUE, STRESS_VALUE_DECIMALS,
};
use crate::emotion::Emotion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete stress outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLabel {
    #[serde(rename = "High Stress")]
    High,
    #[serde(rename = "Low Stress")]
    Low,
    #[serde(rename = "No Face Detected")]
    NoFace,
}

impl StressLabel {
    /// Label for the unrounded stress value of a scored face
    pub fn from_value(stress_value: f64) -> Self {
        if stress_value >= HIGH_STRESS_THRESHOLD {
            StressLabel::High
        } else {
            StressLabel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLabel::High => "High Stress",
            StressLabel::Low => "Low Stress",
            StressLabel::NoFace => "No Face Detected",
        }
    }
}

impl fmt::Display for StressLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an emotion counts as stressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionBucket {
    Stressed,
    NotStressed,
}

impl EmotionBucket {
    pub fn from_emotion(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Scared | Emotion::Sad | Emotion::Angry => EmotionBucket::Stressed,
            _ => EmotionBucket::NotStressed,
        }
    }
}

/// The result reported for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressAssessment {
    pub stress_label: StressLabel,
    pub stress_value: f64,
    pub emotion: Emotion,
}

impl StressAssessment {
    /// Sentinel for frames without a detectable face
    pub const fn no_face() -> Self {
        Self {
            stress_label: StressLabel::NoFace,
            stress_value: 0.0,
            emotion: Emotion::Unknown,
        }
    }

    /// Stressed/not-stressed reading of the reported emotion; not serialized
    pub fn emotion_bucket(&self) -> EmotionBucket {
        EmotionBucket::from_emotion(self.emotion)
    }
}

/// Score one face from its apertures (in pixels) and classified emotion
pub fn score(eye_aperture: f64, lip_aperture: f64, emotion: Emotion) -> StressAssessment {
    let combined = (eye_aperture + lip_aperture) / 2.0;
    let raw = (-combined).exp();
    // Thresholded before rounding; only the reported value is rounded.
    let stress_label = StressLabel::from_value(raw);
    let stress_value = report_value(raw);

    let bucket = EmotionBucket::from_emotion(emotion);
    log::debug!(
        "combined aperture {combined:.4} -> {raw:.6} reported as {stress_value} ({stress_label}), emotion {emotion} ({bucket:?})"
    );

    StressAssessment {
        stress_label,
        stress_value,
        emotion,
    }
}

/// Round to the reported precision, keeping scored faces above zero
fn report_value(raw: f64) -> f64 {
    let factor = 10f64.powi(STRESS_VALUE_DECIMALS);
    let rounded = (raw * factor).round() / factor;
    rounded.clamp(MIN_FACE_STRESS_VALUE, 1.0)
}
