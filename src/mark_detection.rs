//! 68-point facial landmark prediction.

use crate::constants::NUM_FACIAL_LANDMARKS;
use crate::face_detection::FaceRegion;
use crate::frame::GrayFrame;
use crate::landmarks::Point;
use crate::utils::clamp_region;
use crate::utils::image_conversion::mat_to_nhwc_f32;
use crate::{Error, Result};
use ndarray::CowArray;
use opencv::core::{Mat, Rect, Size};
use opencv::imgproc::{self, InterpolationFlags};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// A pretrained 68-point landmark predictor
pub trait LandmarkPredictor: Send {
    /// Landmarks of the face in `region`, in frame coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn predict(&mut self, gray: &GrayFrame, region: &FaceRegion) -> Result<Vec<Point>>;
}

/// Facial landmark detector using `ONNX` Runtime
pub struct OnnxMarkDetector {
    session: Session,
    input_size: i32,
}

impl OnnxMarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no inputs or outputs
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing OnnxMarkDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Run the model on a face crop; returns flat `[x0, y0, x1, y1, ...]` in input pixels
    fn forward(&self, crop: &Mat) -> Result<Vec<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            crop,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_GRAY2RGB, 0)?;

        let tensor = mat_to_nhwc_f32(&rgb, 1.0 / 255.0, 0.0)?;
        let input = CowArray::from(tensor.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &input)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let marks = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?
            .try_extract::<f32>()?;

        let marks: Vec<f32> = marks.view().iter().copied().collect();
        Ok(marks)
    }
}

impl LandmarkPredictor for OnnxMarkDetector {
    fn predict(&mut self, gray: &GrayFrame, region: &FaceRegion) -> Result<Vec<Point>> {
        let rect = clamp_region(region, gray.width(), gray.height()).ok_or_else(|| {
            Error::InvalidInput(format!("Face region {region:?} lies outside the frame"))
        })?;
        let crop = gray.crop(region)?;

        let marks = self.forward(&crop)?;
        log::debug!("Landmark model returned {} values", marks.len());

        marks_to_points(&marks, rect, self.input_size)
    }
}

/// Map model output, in input-pixel units, onto the face crop's frame position
///
/// # Errors
///
/// Returns `ModelValidationError` unless the output holds exactly 68 `(x, y)` pairs
fn marks_to_points(marks: &[f32], crop: Rect, input_size: i32) -> Result<Vec<Point>> {
    if marks.len() != 2 * NUM_FACIAL_LANDMARKS {
        return Err(Error::ModelValidationError(format!(
            "Expected {} landmark values, got {}",
            2 * NUM_FACIAL_LANDMARKS,
            marks.len()
        )));
    }

    let scale_x = f64::from(crop.width) / f64::from(input_size);
    let scale_y = f64::from(crop.height) / f64::from(input_size);

    Ok(marks
        .chunks_exact(2)
        .map(|xy| {
            Point::new(
                f64::from(crop.x) + f64::from(xy[0]) * scale_x,
                f64::from(crop.y) + f64::from(xy[1]) * scale_y,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks_with_prefix(prefix: &[f32]) -> Vec<f32> {
        let mut marks = vec![64.0; 2 * NUM_FACIAL_LANDMARKS];
        marks[..prefix.len()].copy_from_slice(prefix);
        marks
    }

    #[test]
    fn test_marks_mapped_into_frame() {
        // 128px model input over a 64x32 crop at (100, 50)
        let marks = marks_with_prefix(&[0.0, 0.0, 128.0, 128.0, 64.0, 32.0]);
        let points = marks_to_points(&marks, Rect::new(100, 50, 64, 32), 128).unwrap();

        assert_eq!(points.len(), NUM_FACIAL_LANDMARKS);
        assert_eq!(
            &points[..3],
            &[Point::new(100.0, 50.0), Point::new(164.0, 82.0), Point::new(132.0, 58.0)]
        );
    }

    #[test]
    fn test_oversized_output_rejected() {
        let crop = Rect::new(0, 0, 128, 128);

        // 68 points plus a stray value
        let marks = vec![1.0; 2 * NUM_FACIAL_LANDMARKS + 1];
        assert!(matches!(
            marks_to_points(&marks, crop, 128),
            Err(Error::ModelValidationError(_))
        ));

        // 69 points
        let marks = vec![1.0; 2 * (NUM_FACIAL_LANDMARKS + 1)];
        assert!(matches!(
            marks_to_points(&marks, crop, 128),
            Err(Error::ModelValidationError(_))
        ));
    }

    #[test]
    fn test_short_output_rejected() {
        let crop = Rect::new(0, 0, 128, 128);

        for len in [0, 1, 2 * 67, 2 * NUM_FACIAL_LANDMARKS - 1] {
            let marks = vec![1.0; len];
            match marks_to_points(&marks, crop, 128) {
                Err(Error::ModelValidationError(msg)) => assert!(msg.contains(&len.to_string())),
                other => panic!("Expected ModelValidationError for {len} values, got {other:?}"),
            }
        }
    }
}
