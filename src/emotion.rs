//! Emotion classification of a detected face.
//!
//! The classifier sees the face crop of the grayscale frame, resized to
//! 64x64 and scaled to `[0, 1]`. A failing classifier never fails the
//! request: [`classify`] reports a [`Classification::Fault`] instead and the
//! caller carries on with geometry alone.

use crate::constants::{EMOTION_INPUT_SIZE, PIXEL_SCALE};
use crate::face_detection::FaceRegion;
use crate::frame::GrayFrame;
use crate::utils::image_conversion::{mat_to_nhwc_f32, replicate_channels};
use crate::{Error, Result};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Size};
use opencv::imgproc::{self, InterpolationFlags};
use ort::{Environment, Session, Value};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Emotion categories, in the classifier's output order, plus `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Scared,
    Happy,
    Sad,
    Surprised,
    Neutral,
    /// No classification available
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Emotion {
    /// The classifier vocabulary, indexed like its output vector
    pub const VOCABULARY: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Scared,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprised,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Scared => "scared",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
            Emotion::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier scores, one per vocabulary entry
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionDistribution {
    scores: [f32; 7],
}

impl EmotionDistribution {
    /// Validate raw classifier output
    ///
    /// # Errors
    ///
    /// Returns `ModelOutputError` if there are not 7 scores or any is not finite
    pub fn new(scores: &[f32]) -> Result<Self> {
        let scores: [f32; 7] = scores.try_into().map_err(|_| {
            Error::ModelOutputError(format!(
                "Expected {} emotion scores, got {}",
                Emotion::VOCABULARY.len(),
                scores.len()
            ))
        })?;
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::ModelOutputError("Emotion scores contain non-finite values".to_string()));
        }
        Ok(Self { scores })
    }

    pub fn scores(&self) -> &[f32; 7] {
        &self.scores
    }

    /// Score of one category; `None` for `Unknown`
    pub fn score(&self, emotion: Emotion) -> Option<f32> {
        Emotion::VOCABULARY
            .iter()
            .position(|&e| e == emotion)
            .map(|idx| self.scores[idx])
    }

    /// Category with the highest score; ties go to the earlier category
    pub fn label(&self) -> Emotion {
        let mut best = 0;
        for (idx, &score) in self.scores.iter().enumerate().skip(1) {
            if score > self.scores[best] {
                best = idx;
            }
        }
        Emotion::VOCABULARY[best]
    }
}

/// Result of running the classifier on one face
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Success {
        emotion: Emotion,
        distribution: EmotionDistribution,
    },
    Fault {
        reason: String,
    },
}

impl Classification {
    /// Emotion to report, `Unknown` on fault
    pub fn emotion(&self) -> Emotion {
        match self {
            Classification::Success { emotion, .. } => *emotion,
            Classification::Fault { .. } => Emotion::Unknown,
        }
    }

    pub fn distribution(&self) -> Option<&EmotionDistribution> {
        match self {
            Classification::Success { distribution, .. } => Some(distribution),
            Classification::Fault { .. } => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Classification::Fault { .. })
    }
}

/// A pretrained emotion classifier
pub trait EmotionClassifier: Send {
    /// Channels the classifier expects in its NHWC input
    fn input_channels(&self) -> usize {
        1
    }

    /// Raw scores for a `(1, 64, 64, channels)` patch
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn predict(&mut self, patch: &Array4<f32>) -> Result<Vec<f32>>;
}

/// Build the classifier input for a face region
///
/// # Errors
///
/// Returns an error if the region does not overlap the frame or a conversion fails
pub fn prepare_patch(gray: &GrayFrame, region: &FaceRegion, channels: usize) -> Result<Array4<f32>> {
    let crop = gray.crop(region)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &crop,
        &mut resized,
        Size::new(EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE),
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;

    let patch = mat_to_nhwc_f32(&resized, PIXEL_SCALE, 0.0)?;
    replicate_channels(patch, channels)
}

/// Classify the emotion of one face, absorbing any failure or panic
pub fn classify(
    classifier: &mut dyn EmotionClassifier,
    gray: &GrayFrame,
    region: &FaceRegion,
) -> Classification {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        prepare_patch(gray, region, classifier.input_channels())
            .and_then(|patch| classifier.predict(&patch))
            .and_then(|scores| EmotionDistribution::new(&scores))
    }))
    .unwrap_or_else(|payload| {
        Err(Error::ModelError(format!(
            "Emotion classifier panicked: {}",
            panic_message(&*payload)
        )))
    });

    match outcome {
        Ok(distribution) => Classification::Success {
            emotion: distribution.label(),
            distribution,
        },
        Err(e) => {
            log::warn!("Emotion classification failed, continuing without it: {e}");
            Classification::Fault { reason: e.to_string() }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// mini-XCEPTION style emotion classifier using `ONNX` Runtime
pub struct OnnxEmotionClassifier {
    session: Session,
    input_channels: usize,
}

impl OnnxEmotionClassifier {
    /// Load the classifier from an `ONNX` model file
    ///
    /// The model takes an NHWC `[batch, 64, 64, channels]` input and returns
    /// 7 softmax scores.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing OnnxEmotionClassifier with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("emotion_classifier")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let dimensions = &session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?
            .dimensions;

        let input_channels = dimensions
            .get(3)
            .copied()
            .flatten()
            .and_then(|d| usize::try_from(d).ok())
            .unwrap_or(1);

        let square_64 = dimensions
            .iter()
            .skip(1)
            .take(2)
            .all(|d| d.map_or(true, |d| i64::from(d) == i64::from(EMOTION_INPUT_SIZE)));
        if !square_64 {
            log::warn!("Emotion model input {dimensions:?} is not 64x64, results may be meaningless");
        }

        Ok(Self { session, input_channels })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn predict(&mut self, patch: &Array4<f32>) -> Result<Vec<f32>> {
        let input = CowArray::from(patch.view().into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &input)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let scores = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?
            .try_extract::<f32>()?;

        let scores: Vec<f32> = scores.view().iter().copied().collect();
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1};

    struct FixedScores(Vec<f32>);

    impl EmotionClassifier for FixedScores {
        fn predict(&mut self, patch: &Array4<f32>) -> Result<Vec<f32>> {
            assert_eq!(patch.shape(), &[1, 64, 64, 1]);
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl EmotionClassifier for Failing {
        fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
            Err(Error::ModelError("shape mismatch".to_string()))
        }
    }

    fn gray_frame(value: f64) -> GrayFrame {
        let mat = Mat::new_rows_cols_with_default(120, 160, CV_8UC1, Scalar::all(value)).unwrap();
        GrayFrame::from_mat(mat).unwrap()
    }

    #[test]
    fn test_vocabulary_order() {
        let names: Vec<_> = Emotion::VOCABULARY.iter().map(Emotion::as_str).collect();
        assert_eq!(names, ["angry", "disgust", "scared", "happy", "sad", "surprised", "neutral"]);
    }

    #[test]
    fn test_emotion_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Emotion::Sad).unwrap(), "\"sad\"");
        assert_eq!(serde_json::to_string(&Emotion::Unknown).unwrap(), "\"Unknown\"");
    }

    #[test]
    fn test_label_is_argmax() {
        let dist = EmotionDistribution::new(&[0.05, 0.05, 0.1, 0.1, 0.6, 0.05, 0.05]).unwrap();
        assert_eq!(dist.label(), Emotion::Sad);
        assert_eq!(dist.score(Emotion::Sad), Some(0.6));
        assert_eq!(dist.score(Emotion::Unknown), None);
    }

    #[test]
    fn test_label_ties_go_to_first_index() {
        let dist = EmotionDistribution::new(&[0.1, 0.3, 0.3, 0.0, 0.3, 0.0, 0.0]).unwrap();
        assert_eq!(dist.label(), Emotion::Disgust);
    }

    #[test]
    fn test_distribution_rejects_bad_output() {
        assert!(EmotionDistribution::new(&[0.5, 0.5]).is_err());
        assert!(EmotionDistribution::new(&[f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn test_prepare_patch_shape_and_scale() {
        let gray = gray_frame(255.0);
        let patch = prepare_patch(&gray, &FaceRegion::new(10, 10, 100, 80), 1).unwrap();

        assert_eq!(patch.shape(), &[1, 64, 64, 1]);
        assert!(patch.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_prepare_patch_three_channels() {
        let gray = gray_frame(51.0);
        let patch = prepare_patch(&gray, &FaceRegion::new(0, 0, 32, 32), 3).unwrap();

        assert_eq!(patch.shape(), &[1, 64, 64, 3]);
        assert!(patch.iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_classify_success() {
        let mut classifier = FixedScores(vec![0.0, 0.0, 0.9, 0.0, 0.1, 0.0, 0.0]);
        let result = classify(&mut classifier, &gray_frame(128.0), &FaceRegion::new(20, 20, 64, 64));

        assert_eq!(result.emotion(), Emotion::Scared);
        assert!(result.distribution().is_some());
    }

    #[test]
    fn test_classify_absorbs_inference_failure() {
        let result = classify(&mut Failing, &gray_frame(128.0), &FaceRegion::new(20, 20, 64, 64));

        assert!(result.is_fault());
        assert_eq!(result.emotion(), Emotion::Unknown);
        assert!(result.distribution().is_none());
    }

    #[test]
    fn test_classify_absorbs_wrong_output_length() {
        let mut classifier = FixedScores(vec![1.0; 3]);
        let result = classify(&mut classifier, &gray_frame(128.0), &FaceRegion::new(20, 20, 64, 64));

        assert_eq!(result.emotion(), Emotion::Unknown);
    }

    #[test]
    fn test_classify_absorbs_panic() {
        struct Crashing;

        impl EmotionClassifier for Crashing {
            fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
                panic!("runtime aborted inference");
            }
        }

        let result = classify(&mut Crashing, &gray_frame(128.0), &FaceRegion::new(20, 20, 64, 64));

        assert_eq!(result.emotion(), Emotion::Unknown);
        match result {
            Classification::Fault { reason } => assert!(reason.contains("runtime aborted inference")),
            other => panic!("Expected a fault, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_absorbs_region_outside_frame() {
        let mut classifier = FixedScores(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let result = classify(&mut classifier, &gray_frame(128.0), &FaceRegion::new(500, 500, 64, 64));

        assert!(result.is_fault());
    }
}
