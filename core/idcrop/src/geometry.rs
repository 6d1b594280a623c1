use serde::Serialize;

use crate::error::IdCropError;
use crate::face::{DetectedFace, Point};
use crate::params::{CropParams, ROTATION_RANGE};
use crate::standard::OutputSpec;

/// Distance from the face box top edge up to the estimated crown, as a
/// fraction of the box height (before zoom).
pub const HEAD_TOP_RATIO: f64 = 0.5;

const SINGULAR_EPSILON: f64 = 1e-12;

/// 2D affine map `(x, y) → (a·x + b·y + c, d·x + e·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine {
    /// x coefficient of x'.
    pub a: f64,
    /// y coefficient of x'.
    pub b: f64,
    /// Constant term of x'.
    pub c: f64,
    /// x coefficient of y'.
    pub d: f64,
    /// y coefficient of y'.
    pub e: f64,
    /// Constant term of y'.
    pub f: f64,
}

impl Affine {
    /// The map that leaves every point in place.
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    /// Uniform scale about the origin.
    pub fn scale(s: f64) -> Self {
        Self {
            a: s,
            e: s,
            ..Self::identity()
        }
    }

    /// Shift by `(tx, ty)`.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            c: tx,
            f: ty,
            ..Self::identity()
        }
    }

    /// Rotation by `theta` radians about the origin. With y pointing down,
    /// positive angles turn clockwise on screen.
    pub fn rotate(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            a: cos,
            b: -sin,
            c: 0.0,
            d: sin,
            e: cos,
            f: 0.0,
        }
    }

    /// Rotation by `theta` radians about `(cx, cy)`.
    pub fn rotate_about(theta: f64, cx: f64, cy: f64) -> Self {
        Self::translate(-cx, -cy)
            .then(&Self::rotate(theta))
            .then(&Self::translate(cx, cy))
    }

    /// The map that applies `self` first and `next` second.
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            a: next.a * self.a + next.b * self.d,
            b: next.a * self.b + next.b * self.e,
            c: next.a * self.c + next.b * self.f + next.c,
            d: next.d * self.a + next.e * self.d,
            e: next.d * self.b + next.e * self.e,
            f: next.d * self.c + next.e * self.f + next.f,
        }
    }

    /// Map a point.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    /// `None` when the map collapses the plane.
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < SINGULAR_EPSILON || !det.is_finite() {
            return None;
        }
        Some(Affine {
            a: self.e / det,
            b: -self.b / det,
            c: (self.b * self.f - self.e * self.c) / det,
            d: -self.d / det,
            e: self.a / det,
            f: (self.d * self.c - self.a * self.f) / det,
        })
    }

    /// Homogeneous 3×3 matrix in row-major order.
    pub fn to_row_major_3x3(&self) -> [f32; 9] {
        [
            self.a as f32,
            self.b as f32,
            self.c as f32,
            self.d as f32,
            self.e as f32,
            self.f as f32,
            0.0,
            0.0,
            1.0,
        ]
    }
}

/// Axis-aligned rectangle in floating-point pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Everything a 2D drawing surface needs to paint the crop.
///
/// `matrix` maps source image pixels to output canvas pixels and is the
/// composition `rotate_about(center) ∘ translate ∘ scale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawTransform {
    /// Output canvas width (pixels).
    pub canvas_width: u32,
    /// Output canvas height (pixels).
    pub canvas_height: u32,
    /// Uniform source → canvas scale.
    pub scale: f64,
    /// Horizontal translation applied after scaling (canvas pixels).
    pub translate_x: f64,
    /// Vertical translation applied after scaling (canvas pixels).
    pub translate_y: f64,
    /// Rotation about the canvas center (radians, clockwise).
    pub rotation_rad: f64,
    /// Estimated crown row in the source image.
    pub head_top_y: f64,
    /// Full source → canvas map.
    pub matrix: Affine,
}

impl DrawTransform {
    /// Map a source point onto the canvas.
    pub fn apply(&self, p: Point) -> Point {
        self.matrix.apply(p)
    }

    /// Canvas corners mapped back into the source image.
    fn source_corners(&self) -> Option<[Point; 4]> {
        let inv = self.matrix.inverse()?;
        let (w, h) = (self.canvas_width as f64, self.canvas_height as f64);
        Some([
            inv.apply(Point::new(0.0, 0.0)),
            inv.apply(Point::new(w, 0.0)),
            inv.apply(Point::new(w, h)),
            inv.apply(Point::new(0.0, h)),
        ])
    }

    /// Bounding box, in source pixels, of the region that ends up on the canvas.
    ///
    /// Without rotation this is exactly the crop rectangle.
    pub fn source_rect(&self) -> Option<Rect> {
        let corners = self.source_corners()?;
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Some(Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    /// The whole output canvas.
    pub fn destination_rect(&self) -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: self.canvas_width as f64,
            height: self.canvas_height as f64,
        }
    }

    /// Whether an `image_width` × `image_height` source fills the whole canvas.
    pub fn covers(&self, image_width: u32, image_height: u32) -> bool {
        let (w, h) = (image_width as f64, image_height as f64);
        // Small tolerance for rounding at exactly-fitting edges
        const SLACK: f64 = 1e-6;
        self.source_corners().is_some_and(|corners| {
            corners.iter().all(|p| {
                p.x >= -SLACK && p.y >= -SLACK && p.x <= w + SLACK && p.y <= h + SLACK
            })
        })
    }

    /// `[a, b, c, d, e, f]` in `CanvasRenderingContext2D.setTransform` order.
    pub fn canvas_matrix(&self) -> [f64; 6] {
        let m = &self.matrix;
        [m.a, m.d, m.b, m.e, m.c, m.f]
    }
}

/// Place `face` on the canvas described by `spec`, adjusted by `params`.
///
/// 1. The canvas is `round(mm / 25.4 * dpi)` pixels per axis (width after any
///    aspect ratio override).
/// 2. The crown is estimated `HEAD_TOP_RATIO × zoom` box heights above the box.
/// 3. The scale maps crown-to-chin onto the middle of the head-height range.
/// 4. The crown lands on the top margin row and the box center on the canvas
///    center column, then the user offsets are added.
/// 5. The rotation turns the result about the canvas center.
pub fn resolve_geometry(
    face: &DetectedFace,
    spec: &OutputSpec,
    params: &CropParams,
) -> Result<DrawTransform, IdCropError> {
    let params = params.clamped();
    let spec = match params.aspect_ratio {
        Some(ratio) => spec.clone().with_aspect_ratio(ratio),
        None => spec.clone(),
    };
    spec.validate()?;

    face.landmarks.check_finite()?;
    let bounds = &face.bounds;
    let chin = face.landmarks.chin;
    let values = [bounds.x, bounds.y, bounds.width, bounds.height];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(IdCropError::DegenerateFace(
            "face coordinates must be finite".to_string(),
        ));
    }
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(IdCropError::DegenerateFace(format!(
            "face box is {}x{}",
            bounds.width, bounds.height
        )));
    }

    let (canvas_width, canvas_height) = spec.pixel_size();

    let head_top_y = bounds.top() - bounds.height * HEAD_TOP_RATIO * params.zoom;
    let head_span = chin.y - head_top_y;
    if head_span <= 0.0 {
        return Err(IdCropError::DegenerateFace(format!(
            "chin (y={:.1}) is above the estimated crown (y={head_top_y:.1})",
            chin.y
        )));
    }
    let scale = spec.target_head_height_px() / head_span;

    let translate_x = canvas_width as f64 / 2.0 - scale * bounds.center_x() + params.offset_x;
    let translate_y = spec.top_margin_px() - scale * head_top_y + params.offset_y;

    let mut rotation_deg = params.rotation_deg;
    if params.auto_level {
        rotation_deg -= face.landmarks.eye_line_angle();
    }
    let rotation_rad = rotation_deg
        .clamp(*ROTATION_RANGE.start(), *ROTATION_RANGE.end())
        .to_radians();

    let matrix = Affine::scale(scale)
        .then(&Affine::translate(translate_x, translate_y))
        .then(&Affine::rotate_about(
            rotation_rad,
            canvas_width as f64 / 2.0,
            canvas_height as f64 / 2.0,
        ));

    Ok(DrawTransform {
        canvas_width,
        canvas_height,
        scale,
        translate_x,
        translate_y,
        rotation_rad,
        head_top_y,
        matrix,
    })
}
