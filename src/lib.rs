//! Single-frame stress estimation from a facial image.
//!
//! This library infers a momentary stress assessment from one image by
//! combining facial geometry with an emotion classifier:
//! - `OpenCV` for decoding, colour conversion and resizing
//! - ONNX Runtime for face detection, 68-point landmarks and emotion classification
//!
//! The estimation pipeline consists of:
//! 1. Face detection on the grayscale frame
//! 2. Selection of one face (first detected by default)
//! 3. Facial landmark prediction (68 points)
//! 4. Eye and lip apertures from the landmarks
//! 5. Emotion classification of the face crop; a failure here degrades to `Unknown`
//! 6. Fusion into a stress value and label
//!
//! # Examples
//!
//! ## Assessing an image file
//!
//! ```no_run
//! use stress_estimation::{config::Config, pipeline::StressPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = StressPipeline::from_config(&Config::default())?;
//!
//! let bytes = std::fs::read("face.jpg")?;
//! let assessment = pipeline.assess_stress(&bytes)?;
//! println!("{}", serde_json::to_string(&assessment)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Scoring landmarks directly
//!
//! ```
//! use stress_estimation::{emotion::Emotion, stress::{score, StressLabel}};
//!
//! let assessment = score(0.36, 0.36, Emotion::Sad);
//! assert_eq!(assessment.stress_value, 0.70);
//! assert_eq!(assessment.stress_label, StressLabel::High);
//! ```

/// Command-line arguments for the binary
pub mod cli;

/// Constants used throughout the crate
pub mod constants;

/// Configuration management
pub mod config;

/// Emotion classifier interface, preprocessing and `ONNX` backend
pub mod emotion;

/// Error types and result handling
pub mod error;

/// Face detection interface, selection policy and SCRFD backend
pub mod face_detection;

/// Decoded frames
pub mod frame;

/// Landmark sets and aperture measurements
pub mod landmarks;

/// Facial landmark detection module for finding 68 key points
pub mod mark_detection;

/// Shared, read-only model context
pub mod models;

/// The single-frame stress pipeline
pub mod pipeline;

/// Stress scoring
pub mod stress;

/// Utility functions for image processing and coordinate transformations
pub mod utils;

pub use error::{Error, FaultKind, Result};
pub use pipeline::StressPipeline;
pub use stress::{StressAssessment, StressLabel};
