//! Face localization: detector interface, selection policy and an SCRFD backend.

use crate::constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE};
use crate::frame::GrayFrame;
use crate::utils::image_conversion::{mat_to_nhwc_f32, nhwc_to_nchw};
use crate::utils::safe_cast::f32_to_i32_clamp;
use crate::{Error, Result};
use ndarray::CowArray;
use opencv::core::{Mat, Rect, Scalar, Size, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Axis-aligned face rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Area in square pixels; zero for degenerate regions
    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }
}

impl From<Rect> for FaceRegion {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// A pretrained face detector
pub trait FaceDetector: Send {
    /// Find faces in a grayscale frame. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect(&mut self, gray: &GrayFrame) -> Result<Vec<FaceRegion>>;
}

/// Which face is scored when the detector finds several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSelection {
    /// First region in detector order
    #[default]
    First,
    /// Region with the largest area, earliest on ties
    Largest,
}

impl FaceSelection {
    pub fn select(&self, regions: &[FaceRegion]) -> Option<FaceRegion> {
        match self {
            FaceSelection::First => regions.first().copied(),
            FaceSelection::Largest => regions
                .iter()
                .copied()
                .reduce(|best, region| if region.area() > best.area() { region } else { best }),
        }
    }
}

impl FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(FaceSelection::First),
            "largest" => Ok(FaceSelection::Largest),
            other => Err(format!("Unknown face selection '{other}', expected 'first' or 'largest'")),
        }
    }
}

impl fmt::Display for FaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceSelection::First => f.write_str("first"),
            FaceSelection::Largest => f.write_str("largest"),
        }
    }
}

/// Output layout of an SCRFD export
#[derive(Debug, Clone, PartialEq)]
struct ScrfdLayout {
    strides: Vec<i32>,
    anchors_per_cell: usize,
    /// Index distance between a stride's score output and its box output
    bbox_offset: usize,
}

impl ScrfdLayout {
    fn from_output_count(count: usize) -> Self {
        let (bbox_offset, strides, anchors_per_cell) = match count {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            _ => {
                log::warn!("Unknown SCRFD configuration with {count} outputs, using 3-stride layout");
                (3, vec![8, 16, 32], 2)
            }
        };
        Self {
            strides,
            anchors_per_cell,
            bbox_offset,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        let inter = w * h;
        inter / (self.area() + other.area() - inter)
    }
}

/// SCRFD face detector using `ONNX` Runtime
pub struct ScrfdFaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    layout: ScrfdLayout,
    anchors: AnchorCache,
}

impl ScrfdFaceDetector {
    /// Create a new face detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing ScrfdFaceDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let dimensions = &session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?
            .dimensions;

        // [batch, channels, height, width]; dynamic axes fall back to 640
        let side = |idx: usize| {
            dimensions
                .get(idx)
                .copied()
                .flatten()
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(640)
        };
        let input_size = (side(3), side(2));

        let layout = ScrfdLayout::from_output_count(session.outputs.len());

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            layout,
            anchors: AnchorCache::default(),
        })
    }

    /// Letterbox the frame into the model input; returns the tensor and the scale used
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn preprocess(&self, gray: &GrayFrame) -> Result<(CowArray<'static, f32, ndarray::IxDyn>, f32)> {
        let (input_width, input_height) = self.input_size;
        let image_ratio = gray.height() as f32 / gray.width() as f32;
        let model_ratio = input_height as f32 / input_width as f32;

        let (new_width, new_height) = if image_ratio > model_ratio {
            ((input_height as f32 / image_ratio) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * image_ratio) as i32)
        };
        let (new_width, new_height) = (new_width.max(1), new_height.max(1));
        let scale = new_height as f32 / gray.height() as f32;

        let mut rgb = Mat::default();
        imgproc::cvt_color(gray.as_mat(), &mut rgb, imgproc::COLOR_GRAY2RGB, 0)?;

        let mut resized = Mat::default();
        imgproc::resize(
            &rgb,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut canvas = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = canvas.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let tensor = mat_to_nhwc_f32(
            &canvas,
            1.0 / f64::from(IMAGE_NORMALIZATION_SCALE),
            -f64::from(IMAGE_NORMALIZATION_OFFSET) / f64::from(IMAGE_NORMALIZATION_SCALE),
        )?;

        Ok((CowArray::from(nhwc_to_nchw(tensor).into_dyn()), scale))
    }
}

/// Anchor centres per feature map, reused across frames of the same size
#[derive(Debug, Default)]
struct AnchorCache {
    centers: HashMap<(i32, i32, i32), Vec<(f32, f32)>>,
}

impl AnchorCache {
    #[allow(clippy::cast_precision_loss)]
    fn get(&mut self, height: i32, width: i32, stride: i32, per_cell: usize) -> &[(f32, f32)] {
        self.centers.entry((height, width, stride)).or_insert_with(|| {
            let mut centers = Vec::new();
            for y in 0..height {
                for x in 0..width {
                    let center = ((x * stride) as f32, (y * stride) as f32);
                    centers.extend(std::iter::repeat(center).take(per_cell));
                }
            }
            centers
        })
    }
}

/// Turn per-stride score and distance outputs into frame-space candidates
fn decode_outputs(
    layout: &ScrfdLayout,
    input_size: (i32, i32),
    conf_threshold: f32,
    tensors: &[Vec<f32>],
    scale: f32,
    anchors: &mut AnchorCache,
) -> Result<Vec<Candidate>> {
    let required = layout.strides.len() + layout.bbox_offset;
    if tensors.len() < required {
        return Err(Error::ModelOutputError(format!(
            "SCRFD model returned {} outputs, expected at least {required}",
            tensors.len()
        )));
    }

    let (input_width, input_height) = input_size;
    let mut candidates = Vec::new();

    for (idx, &stride) in layout.strides.iter().enumerate() {
        let scores = &tensors[idx];
        let distances = &tensors[idx + layout.bbox_offset];
        let centers = anchors.get(
            input_height / stride,
            input_width / stride,
            stride,
            layout.anchors_per_cell,
        );

        if distances.len() != scores.len() * 4 || centers.len() < scores.len() {
            return Err(Error::ModelDataFormatError(format!(
                "Stride {stride}: {} scores, {} box values, {} anchors",
                scores.len(),
                distances.len(),
                centers.len()
            )));
        }

        #[allow(clippy::cast_precision_loss)]
        let stride = stride as f32;
        for (anchor, &score) in scores.iter().enumerate() {
            if score < conf_threshold {
                continue;
            }
            let (cx, cy) = centers[anchor];
            let d = &distances[anchor * 4..anchor * 4 + 4];
            candidates.push(Candidate {
                score,
                x1: (cx - d[0] * stride) / scale,
                y1: (cy - d[1] * stride) / scale,
                x2: (cx + d[2] * stride) / scale,
                y2: (cy + d[3] * stride) / scale,
            });
        }
    }

    Ok(candidates)
}

/// Greedy non-maximum suppression, highest score first
fn suppress(mut candidates: Vec<Candidate>, nms_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= nms_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

impl FaceDetector for ScrfdFaceDetector {
    fn detect(&mut self, gray: &GrayFrame) -> Result<Vec<FaceRegion>> {
        let (input, scale) = self.preprocess(gray)?;
        let input_tensor = Value::from_array(self.session.allocator(), &input)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let tensor = output.try_extract::<f32>()?;
            tensors.push(tensor.view().iter().copied().collect::<Vec<f32>>());
        }

        let candidates = decode_outputs(
            &self.layout,
            self.input_size,
            self.conf_threshold,
            &tensors,
            scale,
            &mut self.anchors,
        )?;
        let kept = suppress(candidates, self.nms_threshold);
        log::debug!("SCRFD kept {} faces", kept.len());

        let (max_x, max_y) = (gray.width(), gray.height());
        Ok(kept
            .into_iter()
            .map(|c| {
                let x1 = f32_to_i32_clamp(c.x1, 0, max_x);
                let y1 = f32_to_i32_clamp(c.y1, 0, max_y);
                let x2 = f32_to_i32_clamp(c.x2, 0, max_x);
                let y2 = f32_to_i32_clamp(c.y2, 0, max_y);
                FaceRegion::new(x1, y1, x2 - x1, y2 - y1)
            })
            .filter(|region| region.area() > 0)
            .collect())
    }
}
