use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Allowed zoom (head-height factor) values.
pub const ZOOM_RANGE: RangeInclusive<f64> = 0.5..=2.0;

/// Allowed user offset on either axis, in output pixels.
pub const OFFSET_RANGE: RangeInclusive<f64> = -200.0..=200.0;

/// Allowed user rotation, in degrees.
pub const ROTATION_RANGE: RangeInclusive<f64> = -45.0..=45.0;

/// Allowed aspect ratio overrides (width / height).
pub const ASPECT_RATIO_RANGE: RangeInclusive<f64> = 0.5..=2.0;

/// User adjustments applied on top of the automatic face placement.
///
/// Every value is clamped into its range before use, so callers can pass raw
/// slider input straight through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CropParams {
    /// Scales the estimated distance from the face box to the crown.
    /// Values above 1.0 assume more hair above the box and shrink the face.
    pub zoom: f64,
    /// Horizontal shift of the face in output pixels (positive moves right).
    pub offset_x: f64,
    /// Vertical shift of the face in output pixels (positive moves down).
    pub offset_y: f64,
    /// Rotation around the canvas center in degrees (positive is clockwise).
    pub rotation_deg: f64,
    /// Override for the standard's width / height ratio.
    pub aspect_ratio: Option<f64>,
    /// Add the rotation that levels the eye line.
    pub auto_level: bool,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0.0,
            aspect_ratio: None,
            auto_level: false,
        }
    }
}

fn clamp_to(value: f64, range: &RangeInclusive<f64>, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

impl CropParams {
    /// Copy with every scalar forced into its allowed range.
    ///
    /// NaN and infinities fall back to the default value.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            zoom: clamp_to(self.zoom, &ZOOM_RANGE, defaults.zoom),
            offset_x: clamp_to(self.offset_x, &OFFSET_RANGE, defaults.offset_x),
            offset_y: clamp_to(self.offset_y, &OFFSET_RANGE, defaults.offset_y),
            rotation_deg: clamp_to(self.rotation_deg, &ROTATION_RANGE, defaults.rotation_deg),
            aspect_ratio: self
                .aspect_ratio
                .filter(|r| r.is_finite())
                .map(|r| r.clamp(*ASPECT_RATIO_RANGE.start(), *ASPECT_RATIO_RANGE.end())),
            auto_level: self.auto_level,
        }
    }
}
