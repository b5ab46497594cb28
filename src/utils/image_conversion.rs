//! Conversions from `OpenCV` Mats into ndarray model inputs.

use super::safe_cast::{i32_to_usize, usize_to_i32};
use crate::{Error, Result};
use ndarray::{Array4, Axis};
use opencv::core::{Mat, Vec3f, CV_32F};
use opencv::prelude::*;

/// Convert an 8-bit Mat into a `(1, height, width, channels)` f32 tensor
///
/// Every value is mapped through `value * alpha + beta`.
///
/// # Errors
/// * Returns error if the Mat is empty or has other than 1 or 3 channels
/// * Returns error if pixel data cannot be accessed
pub fn mat_to_nhwc_f32(mat: &Mat, alpha: f64, beta: f64) -> Result<Array4<f32>> {
    let rows = i32_to_usize(mat.rows())?;
    let cols = i32_to_usize(mat.cols())?;
    let channels = i32_to_usize(mat.channels())?;

    if rows == 0 || cols == 0 {
        return Err(Error::InvalidInput(format!("Empty Mat: {rows}x{cols}")));
    }
    if channels != 1 && channels != 3 {
        return Err(Error::InvalidInput(format!("Unsupported channel count: {channels}")));
    }

    let mut float_mat = Mat::default();
    mat.convert_to(&mut float_mat, CV_32F, alpha, beta)?;

    let mut data = Vec::with_capacity(rows * cols * channels);
    for row in 0..rows {
        let r = usize_to_i32(row)?;
        for col in 0..cols {
            let c = usize_to_i32(col)?;
            if channels == 3 {
                let pixel = float_mat.at_2d::<Vec3f>(r, c)?;
                data.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
            } else {
                data.push(*float_mat.at_2d::<f32>(r, c)?);
            }
        }
    }

    Array4::from_shape_vec((1, rows, cols, channels), data)
        .map_err(|e| Error::ModelDataFormatError(format!("Failed to create tensor: {e}")))
}

/// Repeat a single-channel NHWC tensor across `channels` channels
///
/// # Errors
/// * Returns error if the input has more than one channel
pub fn replicate_channels(tensor: Array4<f32>, channels: usize) -> Result<Array4<f32>> {
    let current = tensor.len_of(Axis(3));
    if current == channels {
        return Ok(tensor);
    }
    if current != 1 {
        return Err(Error::ModelDataFormatError(format!(
            "Cannot expand {current} channels to {channels}"
        )));
    }

    let views = vec![tensor.view(); channels];
    ndarray::concatenate(Axis(3), &views)
        .map_err(|e| Error::ModelDataFormatError(format!("Failed to replicate channels: {e}")))
}

/// Reorder an NHWC tensor to NCHW
pub fn nhwc_to_nchw(tensor: Array4<f32>) -> Array4<f32> {
    tensor.permuted_axes([0, 3, 1, 2]).as_standard_layout().to_owned()
}
