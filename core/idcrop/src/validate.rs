use serde::{Deserialize, Serialize};

use crate::error::IdCropError;
use crate::face::{select_primary_face, DetectedFace};

/// Limits checked before a photo is cropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    /// Smallest accepted source width (pixels).
    pub min_width: u32,
    /// Smallest accepted source height (pixels).
    pub min_height: u32,
    /// Largest accepted eye-line tilt (degrees, either direction).
    pub max_tilt_deg: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_width: 600,
            min_height: 600,
            max_tilt_deg: 10.0,
        }
    }
}

impl ValidationSettings {
    /// Settings that accept any resolution and any tilt.
    pub fn permissive() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_tilt_deg: 90.0,
        }
    }
}

/// Reject sources below the configured minimum size.
pub fn check_resolution(
    width: u32,
    height: u32,
    settings: &ValidationSettings,
) -> Result<(), IdCropError> {
    if width == 0 || height == 0 {
        return Err(IdCropError::ZeroDimensions);
    }
    if width < settings.min_width || height < settings.min_height {
        return Err(IdCropError::ResolutionTooLow {
            width,
            height,
            min_width: settings.min_width,
            min_height: settings.min_height,
        });
    }
    Ok(())
}

/// Reject faces whose eye line is tilted past the tolerance.
///
/// Landmarks with non-finite coordinates are reported as
/// [`IdCropError::InvalidLandmarks`].
pub fn check_frontal(
    face: &DetectedFace,
    settings: &ValidationSettings,
) -> Result<(), IdCropError> {
    face.landmarks.check_finite()?;
    let angle = face.landmarks.eye_line_angle();
    if angle.abs() > settings.max_tilt_deg {
        return Err(IdCropError::NotFrontal {
            angle,
            max: settings.max_tilt_deg,
        });
    }
    Ok(())
}

/// Pick the face to crop, or report that there is none.
pub fn check_face(faces: Vec<DetectedFace>) -> Result<DetectedFace, IdCropError> {
    select_primary_face(faces).ok_or(IdCropError::NoFaceFound)
}
