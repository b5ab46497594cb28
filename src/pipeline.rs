//! Single-frame stress pipeline.
//!
//! Each call runs detector, landmark predictor, classifier and scorer in
//! sequence and ends in one of two states: no face, or one scored face.

use crate::config::Config;
use crate::emotion::{classify, Classification};
use crate::face_detection::{FaceRegion, FaceSelection};
use crate::frame::Frame;
use crate::landmarks::LandmarkSet;
use crate::models::Models;
use crate::stress::{score, StressAssessment};
use crate::Result;
use log::debug;

/// Intermediate values of a scored face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnalysis {
    /// Region that was scored
    pub region: FaceRegion,
    /// Number of regions the detector reported
    pub faces_detected: usize,
    pub eye_aperture: f64,
    pub lip_aperture: f64,
    pub classification: Classification,
    pub assessment: StressAssessment,
}

/// Terminal state of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoFace,
    FaceFound(Box<FaceAnalysis>),
}

impl Outcome {
    pub fn assessment(&self) -> StressAssessment {
        match self {
            Outcome::NoFace => StressAssessment::no_face(),
            Outcome::FaceFound(analysis) => analysis.assessment,
        }
    }
}

/// Stress estimation over injected, read-only models
pub struct StressPipeline {
    models: Models,
    selection: FaceSelection,
}

impl StressPipeline {
    pub fn new(models: Models) -> Self {
        Self {
            models,
            selection: FaceSelection::default(),
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: FaceSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Load the configured models and selection policy
    ///
    /// # Errors
    ///
    /// Returns an error if any model fails to load
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Models::from_config(config)?).with_selection(config.face_detection.selection))
    }

    pub fn selection(&self) -> FaceSelection {
        self.selection
    }

    /// Decode image bytes and assess them
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` for undecodable input, or any error raised by
    /// the detector or landmark predictor
    pub fn assess_stress(&self, image_bytes: &[u8]) -> Result<StressAssessment> {
        let frame = Frame::decode(image_bytes)?;
        self.run(&frame)
    }

    /// Assess a decoded frame
    ///
    /// # Errors
    ///
    /// Returns an error if detection or landmark prediction fails, or the
    /// predictor does not return exactly 68 landmarks
    pub fn run(&self, frame: &Frame) -> Result<StressAssessment> {
        Ok(self.analyze(frame)?.assessment())
    }

    /// Assess a decoded frame, keeping the intermediate values
    ///
    /// # Errors
    ///
    /// Same as [`StressPipeline::run`]
    pub fn analyze(&self, frame: &Frame) -> Result<Outcome> {
        let gray = frame.to_grayscale()?;

        let regions = self.models.face_detector().detect(&gray)?;
        debug!("Detected {} faces in {}x{} frame", regions.len(), frame.width(), frame.height());

        let Some(region) = self.selection.select(&regions) else {
            return Ok(Outcome::NoFace);
        };
        debug!("Scoring face {region:?} ({} policy)", self.selection);

        let points = self.models.landmark_predictor().predict(&gray, &region)?;
        let landmarks = LandmarkSet::new(points)?;

        let classification = {
            let mut classifier = self.models.emotion_classifier();
            classify(&mut **classifier, &gray, &region)
        };

        let (eye_aperture, lip_aperture) = landmarks.apertures();
        let assessment = score(eye_aperture, lip_aperture, classification.emotion());

        Ok(Outcome::FaceFound(Box::new(FaceAnalysis {
            region,
            faces_detected: regions.len(),
            eye_aperture,
            lip_aperture,
            classification,
            assessment,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionClassifier;
    use crate::face_detection::FaceDetector;
    use crate::frame::GrayFrame;
    use crate::landmarks::Point;
    use crate::mark_detection::LandmarkPredictor;
    use ndarray::Array4;
    use opencv::core::{Mat, Scalar, CV_8UC3};

    struct NoFaces;

    impl FaceDetector for NoFaces {
        fn detect(&mut self, _gray: &GrayFrame) -> Result<Vec<FaceRegion>> {
            Ok(Vec::new())
        }
    }

    struct Unreachable;

    impl LandmarkPredictor for Unreachable {
        fn predict(&mut self, _gray: &GrayFrame, _region: &FaceRegion) -> Result<Vec<Point>> {
            panic!("landmarks requested without a face");
        }
    }

    impl EmotionClassifier for Unreachable {
        fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
            panic!("classifier invoked without a face");
        }
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        assert_send_sync::<StressPipeline>();
    }

    #[test]
    fn test_no_face_short_circuits() {
        let pipeline = StressPipeline::new(Models::new(
            Box::new(NoFaces),
            Box::new(Unreachable),
            Box::new(Unreachable),
        ));
        let mat = Mat::new_rows_cols_with_default(60, 80, CV_8UC3, Scalar::all(30.0)).unwrap();
        let frame = Frame::from_mat(mat).unwrap();

        let outcome = pipeline.analyze(&frame).unwrap();
        assert_eq!(outcome, Outcome::NoFace);
        assert_eq!(outcome.assessment(), StressAssessment::no_face());
    }
}
