//! Facial landmark sets and the geometric measurements taken from them.
//!
//! Landmarks follow the 68-point iBUG convention:
//! <https://ibug.doc.ic.ac.uk/resources/facial-point-annotations/>

use crate::constants::{
    EYE_CORNERS, EYE_POINTS, LEFT_EYE, LIP_POINTS, LIP_VERTICAL, NUM_FACIAL_LANDMARKS, OUTER_LIP,
    RIGHT_EYE,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 2D point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Exactly 68 ordered facial landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Validate predictor output into a landmark set
    ///
    /// # Errors
    ///
    /// Returns `ModelValidationError` if there are not exactly 68 points or
    /// any coordinate is not finite
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() != NUM_FACIAL_LANDMARKS {
            return Err(Error::ModelValidationError(format!(
                "Expected {NUM_FACIAL_LANDMARKS} landmarks, got {}",
                points.len()
            )));
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(Error::ModelValidationError(format!(
                "Landmark {idx} has non-finite coordinates"
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn left_eye(&self) -> [Point; EYE_POINTS] {
        self.group(LEFT_EYE.start)
    }

    pub fn right_eye(&self) -> [Point; EYE_POINTS] {
        self.group(RIGHT_EYE.start)
    }

    pub fn outer_lip(&self) -> [Point; LIP_POINTS] {
        self.group(OUTER_LIP.start)
    }

    /// Mean eye aperture and lip aperture, in pixels
    pub fn apertures(&self) -> (f64, f64) {
        (
            combined_eye_aperture(&self.left_eye(), &self.right_eye()),
            lip_aperture(&self.outer_lip()),
        )
    }

    // Length is fixed at construction, so every group lies inside the set.
    fn group<const N: usize>(&self, start: usize) -> [Point; N] {
        std::array::from_fn(|i| self.points[start + i])
    }
}

/// Distance between the horizontal corners of one eye
pub fn eye_aperture(eye: &[Point; EYE_POINTS]) -> f64 {
    eye[EYE_CORNERS.0].distance(&eye[EYE_CORNERS.1])
}

/// Distance between the top and bottom of the outer lip
pub fn lip_aperture(lip: &[Point; LIP_POINTS]) -> f64 {
    lip[LIP_VERTICAL.0].distance(&lip[LIP_VERTICAL.1])
}

/// Mean aperture of both eyes
pub fn combined_eye_aperture(left: &[Point; EYE_POINTS], right: &[Point; EYE_POINTS]) -> f64 {
    (eye_aperture(left) + eye_aperture(right)) / 2.0
}
