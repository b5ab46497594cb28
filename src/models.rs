//! The process-wide set of pretrained models.
//!
//! Models are loaded once and shared by every request. None of the backends
//! promise concurrent inference, so each sits behind its own mutex; requests
//! running in parallel serialize per model, not per pipeline.

use crate::config::Config;
use crate::emotion::{EmotionClassifier, OnnxEmotionClassifier};
use crate::face_detection::{FaceDetector, ScrfdFaceDetector};
use crate::mark_detection::{LandmarkPredictor, OnnxMarkDetector};
use crate::Result;
use std::sync::{Mutex, MutexGuard};

/// Face detector, landmark predictor and emotion classifier
pub struct Models {
    face_detector: Mutex<Box<dyn FaceDetector>>,
    landmark_predictor: Mutex<Box<dyn LandmarkPredictor>>,
    emotion_classifier: Mutex<Box<dyn EmotionClassifier>>,
}

impl Models {
    pub fn new(
        face_detector: Box<dyn FaceDetector>,
        landmark_predictor: Box<dyn LandmarkPredictor>,
        emotion_classifier: Box<dyn EmotionClassifier>,
    ) -> Self {
        Self {
            face_detector: Mutex::new(face_detector),
            landmark_predictor: Mutex::new(landmark_predictor),
            emotion_classifier: Mutex::new(emotion_classifier),
        }
    }

    /// Load the `ONNX` backends named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any model fails to load
    pub fn from_config(config: &Config) -> Result<Self> {
        let face_detector = ScrfdFaceDetector::new(
            &config.models.face_detector,
            config.face_detection.confidence_threshold,
            config.face_detection.iou_threshold,
        )?;
        let landmark_predictor = OnnxMarkDetector::new(&config.models.face_landmarks)?;
        let emotion_classifier = OnnxEmotionClassifier::new(&config.models.emotion_classifier)?;

        Ok(Self::new(
            Box::new(face_detector),
            Box::new(landmark_predictor),
            Box::new(emotion_classifier),
        ))
    }

    pub(crate) fn face_detector(&self) -> MutexGuard<'_, Box<dyn FaceDetector>> {
        lock(&self.face_detector, "face detector")
    }

    pub(crate) fn landmark_predictor(&self) -> MutexGuard<'_, Box<dyn LandmarkPredictor>> {
        lock(&self.landmark_predictor, "landmark predictor")
    }

    pub(crate) fn emotion_classifier(&self) -> MutexGuard<'_, Box<dyn EmotionClassifier>> {
        lock(&self.emotion_classifier, "emotion classifier")
    }
}

// Backends hold no request state, so a guard poisoned by a panicking request
// is still usable.
fn lock<'a, T: ?Sized>(mutex: &'a Mutex<Box<T>>, name: &str) -> MutexGuard<'a, Box<T>> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("The {name} lock was poisoned by an earlier panic, reusing the model");
        poisoned.into_inner()
    })
}
