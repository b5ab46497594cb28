//! Decoded input frames and their grayscale counterpart.

use crate::face_detection::FaceRegion;
use crate::utils::clamp_region;
use crate::{Error, Result};
use opencv::core::{Mat, Vector, CV_8U};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};
use std::fmt;

/// A decoded 8-bit, 3-channel (BGR) image
pub struct Frame {
    mat: Mat,
}

impl Frame {
    /// Decode encoded image bytes (PNG, JPEG, ...) into a frame
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the bytes are empty or not an image
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Decode("No image data received".to_string()));
        }

        let buffer = Vector::<u8>::from_slice(bytes);
        let mat = imgcodecs::imdecode(&buffer, imgcodecs::IMREAD_COLOR)
            .map_err(|e| Error::Decode(e.to_string()))?;

        if mat.rows() <= 0 || mat.cols() <= 0 {
            return Err(Error::Decode(format!(
                "{} bytes did not decode to an image",
                bytes.len()
            )));
        }

        Self::from_mat(mat)
    }

    /// Wrap an existing BGR Mat
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` unless the Mat is non-empty 8-bit 3-channel data
    pub fn from_mat(mat: Mat) -> Result<Self> {
        if mat.rows() <= 0 || mat.cols() <= 0 {
            return Err(Error::InvalidInput("Frame is empty".to_string()));
        }
        if mat.channels() != 3 || mat.depth() != CV_8U {
            return Err(Error::InvalidInput(format!(
                "Frame must be 8-bit with 3 channels, got depth {} with {} channels",
                mat.depth(),
                mat.channels()
            )));
        }
        Ok(Self { mat })
    }

    pub fn as_mat(&self) -> &Mat {
        &self.mat
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }

    /// Convert to a single-channel grayscale frame
    ///
    /// # Errors
    ///
    /// Returns an error if the colour conversion fails
    pub fn to_grayscale(&self) -> Result<GrayFrame> {
        let mut gray = Mat::default();
        imgproc::cvt_color(&self.mat, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        GrayFrame::from_mat(gray)
    }
}

/// A single-channel 8-bit image, the input of every model
pub struct GrayFrame {
    mat: Mat,
}

impl GrayFrame {
    /// Wrap an existing grayscale Mat
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` unless the Mat is non-empty 8-bit single-channel data
    pub fn from_mat(mat: Mat) -> Result<Self> {
        if mat.rows() <= 0 || mat.cols() <= 0 {
            return Err(Error::InvalidInput("Grayscale frame is empty".to_string()));
        }
        if mat.channels() != 1 || mat.depth() != CV_8U {
            return Err(Error::InvalidInput(format!(
                "Grayscale frame must be 8-bit with 1 channel, got {} channels",
                mat.channels()
            )));
        }
        Ok(Self { mat })
    }

    pub fn as_mat(&self) -> &Mat {
        &self.mat
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }

    /// Copy out the part of a face region that lies inside the frame
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the region does not overlap the frame
    pub fn crop(&self, region: &FaceRegion) -> Result<Mat> {
        let rect = clamp_region(region, self.width(), self.height()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Face region {region:?} lies outside the {}x{} frame",
                self.width(),
                self.height()
            ))
        })?;

        let roi = Mat::roi(&self.mat, rect)?;
        Ok(roi.try_clone()?)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({}x{})", self.width(), self.height())
    }
}

impl fmt::Debug for GrayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrayFrame({}x{})", self.width(), self.height())
    }
}
