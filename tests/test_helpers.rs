//! Helper functions and utilities for tests

#![allow(dead_code)]

use ndarray::Array4;
use opencv::{
    core::{Mat, Scalar, Vector, CV_8UC3},
    imgcodecs,
    prelude::*,
};
use stress_estimation::{
    emotion::EmotionClassifier,
    face_detection::{FaceDetector, FaceRegion},
    frame::GrayFrame,
    landmarks::Point,
    mark_detection::LandmarkPredictor,
    models::Models,
    Error, Result,
};

/// Create a BGR test image filled with one value
pub fn create_test_image(height: i32, width: i32, value: f64) -> Result<Mat> {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(value)).map_err(Into::into)
}

/// PNG bytes of a uniform BGR image
pub fn encoded_test_image(height: i32, width: i32) -> Result<Vec<u8>> {
    let mat = create_test_image(height, width, 90.0)?;
    let mut buffer = Vector::<u8>::new();
    imgcodecs::imencode(".png", &mat, &mut buffer, &Vector::new())?;
    Ok(buffer.to_vec())
}

/// 68 landmarks whose eyes both measure `eye` and whose lip measures `lip`
pub fn landmarks_with_apertures(eye: f64, lip: f64) -> Vec<Point> {
    let mut points = vec![Point::new(40.0, 40.0); 68];
    // eye corners: group indices 0 and 3
    points[36] = Point::new(30.0, 40.0);
    points[39] = Point::new(30.0 + eye, 40.0);
    points[42] = Point::new(60.0, 40.0);
    points[45] = Point::new(60.0 + eye, 40.0);
    // lip vertical: group indices 3 and 9
    points[51] = Point::new(50.0, 70.0);
    points[57] = Point::new(50.0, 70.0 + lip);
    points
}

/// Detector returning a fixed list of regions
pub struct FixedDetector(pub Vec<FaceRegion>);

impl FaceDetector for FixedDetector {
    fn detect(&mut self, _gray: &GrayFrame) -> Result<Vec<FaceRegion>> {
        Ok(self.0.clone())
    }
}

/// Landmark predictor returning fixed points and recording the region it saw
pub struct FixedLandmarks {
    pub points: Vec<Point>,
    pub seen: std::sync::Arc<std::sync::Mutex<Vec<FaceRegion>>>,
}

impl FixedLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            seen: Default::default(),
        }
    }
}

impl LandmarkPredictor for FixedLandmarks {
    fn predict(&mut self, _gray: &GrayFrame, region: &FaceRegion) -> Result<Vec<Point>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(*region);
        }
        Ok(self.points.clone())
    }
}

/// Classifier returning fixed scores
pub struct FixedClassifier(pub Vec<f32>);

impl EmotionClassifier for FixedClassifier {
    fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Classifier that always fails
pub struct FailingClassifier;

impl EmotionClassifier for FailingClassifier {
    fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
        Err(Error::ModelError("injected classifier fault".to_string()))
    }
}

/// Classifier that panics on its first call and returns fixed scores after
pub struct PanicOnceClassifier {
    pub scores: Vec<f32>,
    pub calls: usize,
}

impl EmotionClassifier for PanicOnceClassifier {
    fn predict(&mut self, _patch: &Array4<f32>) -> Result<Vec<f32>> {
        self.calls += 1;
        if self.calls == 1 {
            panic!("inference runtime crashed");
        }
        Ok(self.scores.clone())
    }
}

/// Classifier output peaking at `sad`
pub fn sad_scores() -> Vec<f32> {
    vec![0.05, 0.05, 0.1, 0.05, 0.65, 0.05, 0.05]
}

/// Models with a single face, the given landmarks and classifier
pub fn single_face_models(points: Vec<Point>, classifier: Box<dyn EmotionClassifier>) -> Models {
    Models::new(
        Box::new(FixedDetector(vec![FaceRegion::new(20, 20, 80, 80)])),
        Box::new(FixedLandmarks::new(points)),
        classifier,
    )
}
