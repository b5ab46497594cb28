//! Tests for ONNX model loading and inference

use opencv::core::{Mat, Scalar, Vector, CV_8UC1, CV_8UC3};
use opencv::imgcodecs;
use std::path::Path;
use stress_estimation::{
    config::Config,
    emotion::{classify, OnnxEmotionClassifier},
    face_detection::{FaceDetector, FaceRegion, ScrfdFaceDetector},
    frame::GrayFrame,
    mark_detection::{LandmarkPredictor, OnnxMarkDetector},
    Result, StressLabel, StressPipeline,
};

fn gray_frame(height: i32, width: i32) -> Result<GrayFrame> {
    let mat = Mat::new_rows_cols_with_default(height, width, CV_8UC1, Scalar::all(128.0))?;
    GrayFrame::from_mat(mat)
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_load_models() -> Result<()> {
    let config = Config::default();
    for path in [
        &config.models.face_detector,
        &config.models.face_landmarks,
        &config.models.emotion_classifier,
    ] {
        assert!(Path::new(path).exists(), "Model not found: {}", path.display());
    }

    let _pipeline = StressPipeline::from_config(&config)?;
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_face_detection_on_blank_image() -> Result<()> {
    let mut detector = ScrfdFaceDetector::new("assets/face_detector.onnx", 0.5, 0.4)?;

    let faces = detector.detect(&gray_frame(480, 640)?)?;

    // A uniform image has no face
    assert!(faces.is_empty());
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_landmark_inference_returns_68_points() -> Result<()> {
    let mut predictor = OnnxMarkDetector::new("assets/face_landmarks.onnx")?;
    let region = FaceRegion::new(200, 120, 200, 200);

    let points = predictor.predict(&gray_frame(480, 640)?, &region)?;

    assert_eq!(points.len(), 68);
    assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_emotion_inference() -> Result<()> {
    let mut classifier = OnnxEmotionClassifier::new("assets/emotion_classifier.onnx")?;

    let classification = classify(&mut classifier, &gray_frame(480, 640)?, &FaceRegion::new(100, 100, 200, 200));

    assert!(!classification.is_fault());
    let scores = classification.distribution().map(|d| d.scores().to_vec()).unwrap_or_default();
    assert_eq!(scores.len(), 7);
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_blank_image_has_no_face() -> Result<()> {
    let pipeline = StressPipeline::from_config(&Config::default())?;

    let mat = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(200.0))?;
    let mut buffer = Vector::<u8>::new();
    imgcodecs::imencode(".jpg", &mat, &mut buffer, &Vector::new())?;

    let assessment = pipeline.assess_stress(&buffer.to_vec())?;
    assert_eq!(assessment.stress_label, StressLabel::NoFace);
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models and test image"]
fn test_full_pipeline_on_face_image() -> Result<()> {
    let pipeline = StressPipeline::from_config(&Config::default())?;
    let bytes = std::fs::read("test_face.jpg")?;

    let assessment = pipeline.assess_stress(&bytes)?;

    assert_ne!(assessment.stress_label, StressLabel::NoFace);
    assert!(assessment.stress_value > 0.0 && assessment.stress_value <= 1.0);
    Ok(())
}
