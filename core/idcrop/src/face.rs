use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::IdCropError;

/// A point in source image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate (pixels, left to right).
    pub x: f64,
    /// Vertical coordinate (pixels, top to bottom).
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn mean(points: &[Point]) -> Point {
        let n = points.len().max(1) as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }
}

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    #[serde(default = "default_confidence", alias = "score")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl FaceBounds {
    /// Horizontal center of the box.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Top edge of the box.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Bottom edge of the box.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Fixed-index landmark orderings understood by [`Landmarks::from_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LandmarkLayout {
    /// The 68-point iBUG ordering used by dlib and face-api.js.
    #[default]
    Ibug68,
}

impl LandmarkLayout {
    /// Number of points the layout expects.
    pub fn point_count(self) -> usize {
        match self {
            LandmarkLayout::Ibug68 => 68,
        }
    }
}

/// The named facial points the crop geometry is built from.
///
/// "Left" and "right" refer to the image, not the subject: `left_eye` is the
/// eye nearer to x = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmarks {
    /// Center of the eye on the image's left side.
    pub left_eye: Point,
    /// Center of the eye on the image's right side.
    pub right_eye: Point,
    /// Tip of the nose.
    pub nose_tip: Point,
    /// Lowest point of the chin.
    pub chin: Point,
}

impl Landmarks {
    /// Pick the named points out of a fixed-index landmark sequence.
    pub fn from_points(points: &[Point], layout: LandmarkLayout) -> Result<Self, IdCropError> {
        if points.len() < layout.point_count() {
            return Err(IdCropError::InvalidLandmarks(format!(
                "expected {} points, got {}",
                layout.point_count(),
                points.len()
            )));
        }
        if !points.iter().all(Point::is_finite) {
            return Err(IdCropError::InvalidLandmarks(
                "landmark coordinates must be finite".to_string(),
            ));
        }

        match layout {
            LandmarkLayout::Ibug68 => Ok(Self {
                left_eye: Point::mean(&points[36..=41]),
                right_eye: Point::mean(&points[42..=47]),
                nose_tip: points[30],
                chin: points[8],
            }),
        }
    }

    /// Signed tilt of the eye line in degrees.
    ///
    /// Zero for a level face; positive when the right-hand eye sits lower in
    /// the image (a clockwise tilt).
    pub fn eye_line_angle(&self) -> f64 {
        let dx = self.right_eye.x - self.left_eye.x;
        let dy = self.right_eye.y - self.left_eye.y;
        dy.atan2(dx).to_degrees()
    }

    /// Reject named points with NaN or infinite coordinates.
    pub fn check_finite(&self) -> Result<(), IdCropError> {
        let named = [
            ("leftEye", self.left_eye),
            ("rightEye", self.right_eye),
            ("noseTip", self.nose_tip),
            ("chin", self.chin),
        ];
        match named.iter().find(|(_, p)| !p.is_finite()) {
            Some((name, p)) => Err(IdCropError::InvalidLandmarks(format!(
                "{name} is not finite: ({}, {})",
                p.x, p.y
            ))),
            None => Ok(()),
        }
    }
}

/// A face produced by the external detector: a box plus its landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    /// Detection bounding box.
    pub bounds: FaceBounds,
    /// Named landmark points.
    pub landmarks: Landmarks,
}

/// Landmarks as they arrive from a detector: already named, or as a raw
/// fixed-index sequence of `{x, y}` objects or `[x, y]` pairs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LandmarkRecord {
    /// Named points.
    Named(Landmarks),
    /// iBUG-68 ordered points, as objects or `[x, y]` pairs.
    Points(Vec<Point>),
}

/// Loosely shaped detection input accepted by the CLI and the wasm binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    /// Detection box; also read from `box` or `detection`.
    #[serde(alias = "box", alias = "detection")]
    pub bounds: FaceBounds,
    /// Landmarks in any supported shape.
    pub landmarks: LandmarkRecord,
}

impl TryFrom<FaceRecord> for DetectedFace {
    type Error = IdCropError;

    fn try_from(record: FaceRecord) -> Result<Self, Self::Error> {
        let landmarks = match record.landmarks {
            LandmarkRecord::Named(landmarks) => {
                landmarks.check_finite()?;
                landmarks
            }
            LandmarkRecord::Points(points) => {
                Landmarks::from_points(&points, LandmarkLayout::Ibug68)?
            }
        };
        Ok(DetectedFace {
            bounds: record.bounds,
            landmarks,
        })
    }
}

/// Pluggable face detection backend.
///
/// Implement this trait to wire in a landmark detector (ONNX, dlib, etc.)
/// and pass it to [`crate::PhotoCropper::face_detector`].
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<DetectedFace>;
}

/// Choose the face to crop around: the most confident one.
pub fn select_primary_face(faces: Vec<DetectedFace>) -> Option<DetectedFace> {
    if faces.len() > 1 {
        warn!(
            "{} faces detected, using the most confident one",
            faces.len()
        );
    }
    faces.into_iter().max_by(|a, b| {
        a.bounds
            .confidence
            .partial_cmp(&b.bounds.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
