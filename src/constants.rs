//! Constants used throughout the crate

use std::ops::Range;

/// Number of facial landmarks for full face
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Landmark indices of the left eye contour (6 points)
pub const LEFT_EYE: Range<usize> = 36..42;

/// Landmark indices of the right eye contour (6 points)
pub const RIGHT_EYE: Range<usize> = 42..48;

/// Landmark indices of the outer lip contour (12 points)
pub const OUTER_LIP: Range<usize> = 48..60;

/// Points per eye group
pub const EYE_POINTS: usize = 6;

/// Points in the outer lip group
pub const LIP_POINTS: usize = 12;

/// Horizontal eye corners, as indices within an eye group
pub const EYE_CORNERS: (usize, usize) = (0, 3);

/// Top and bottom of the outer lip, as indices within the lip group
pub const LIP_VERTICAL: (usize, usize) = (3, 9);

/// Side length of the square emotion classifier input
pub const EMOTION_INPUT_SIZE: i32 = 64;

/// Pixel intensity scale for the emotion classifier input
pub const PIXEL_SCALE: f64 = 1.0 / 255.0;

/// Stress values at or above this are reported as high stress
pub const HIGH_STRESS_THRESHOLD: f64 = 0.65;

/// Smallest stress value reported for a scored face
pub const MIN_FACE_STRESS_VALUE: f64 = 0.01;

/// Decimal places kept in the reported stress value
pub const STRESS_VALUE_DECIMALS: i32 = 2;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default detector thresholds
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;
