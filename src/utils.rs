//! Utility functions for image processing and coordinate transformations.

pub mod image_conversion;
pub mod safe_cast;

use crate::face_detection::FaceRegion;
use opencv::core::Rect;

/// Intersect a face region with the frame bounds
///
/// Detectors may report boxes that extend past the frame edge. Returns `None`
/// when nothing of the region lies inside the frame.
#[must_use]
pub fn clamp_region(region: &FaceRegion, max_width: i32, max_height: i32) -> Option<Rect> {
    let x1 = region.x.clamp(0, max_width);
    let y1 = region.y.clamp(0, max_height);
    let x2 = region.x.saturating_add(region.width).clamp(0, max_width);
    let y2 = region.y.saturating_add(region.height).clamp(0, max_height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}
