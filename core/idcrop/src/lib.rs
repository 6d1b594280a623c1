//! Identity photo cropping: place a detected face on a fixed-size ID or passport
//! photo canvas at print resolution.
//!
//! The face detector is pluggable. Given a face bounding box and its landmarks,
//! the crate resolves a deterministic draw transform (scale, translate, rotate)
//! that puts the crown on the standard's top margin, the chin at the middle of
//! the allowed head-height range and the face on the vertical center line.
//!
//! # Example
//!
//! ```no_run
//! use idcrop::{DetectedFace, PhotoCropper, Standard};
//!
//! let raw_bytes = std::fs::read("photo.jpg").unwrap();
//! let face: DetectedFace =
//!     serde_json::from_str(&std::fs::read_to_string("face.json").unwrap()).unwrap();
//! let photo = PhotoCropper::new(raw_bytes)
//!     .unwrap()
//!     .standard(Standard::Icao35x45)
//!     .face(face)
//!     .crop()
//!     .unwrap();
//! println!("{}x{} px, {} bytes", photo.width, photo.height, photo.data.len());
//! ```
#![warn(missing_docs)]

mod error;
/// Face, landmark and detector types.
pub mod face;
/// The face placement transform.
pub mod geometry;
/// User crop adjustments and their ranges.
pub mod params;
mod render;
/// Physical photo standards and mm → pixel conversion.
pub mod standard;
/// Checks run before cropping.
pub mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error type returned by idcrop operations.
pub use error::IdCropError;
pub use face::{
    select_primary_face, DetectedFace, FaceBounds, FaceDetector, FaceRecord, LandmarkLayout,
    LandmarkRecord, Landmarks, Point,
};
pub use geometry::{resolve_geometry, Affine, DrawTransform, Rect};
pub use params::CropParams;
pub use standard::{
    mm_to_px, standard_by_name, OutputSpec, Standard, DEFAULT_DPI, MAX_CANVAS_PIXELS, MAX_DPI,
};
pub use validate::ValidationSettings;

/// Output image format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG with the print DPI recorded in the JFIF header.
    #[default]
    Jpeg,

    /// Lossless PNG.
    Png,

    /// Lossless WebP.
    Webp,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// MIME type for downloads.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Whether `quality` changes the encoded output.
    pub fn is_lossy(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(format!(
                "unknown format '{other}'; expected 'jpeg', 'png' or 'webp'"
            )),
        }
    }
}

/// Result of a single crop.
#[derive(Debug, Clone)]
pub struct CroppedPhoto {
    /// The encoded image bytes.
    pub data: Vec<u8>,

    /// The output format used.
    pub format: OutputFormat,

    /// Width of the output image in pixels.
    pub width: u32,

    /// Height of the output image in pixels.
    pub height: u32,

    /// Print resolution the pixel size was derived from.
    pub dpi: u32,

    /// Size of the original input in bytes.
    pub original_size: usize,

    /// The transform used to draw the source onto the canvas.
    pub transform: DrawTransform,

    /// The face the crop was placed around.
    pub face: DetectedFace,
}

/// Result of a `crop_to_fit` operation with byte budget targeting.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// The cropped photo.
    pub photo: CroppedPhoto,

    /// The quality level used (0.0–1.0).
    pub quality_used: f32,

    /// Whether the target byte budget was achieved.
    /// `false` if even minimum quality exceeds `max_bytes`.
    pub reached_target: bool,
}

/// Everything the pipeline needs besides the input and the face source.
#[derive(Debug, Clone)]
pub(crate) struct CropSettings {
    pub(crate) spec: OutputSpec,
    pub(crate) params: CropParams,
    pub(crate) format: OutputFormat,
    pub(crate) quality: f32,
    pub(crate) validation: ValidationSettings,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            spec: Standard::default().spec(),
            params: CropParams::default(),
            format: OutputFormat::default(),
            quality: 0.92,
            validation: ValidationSettings::default(),
        }
    }
}

/// Lowest quality `crop_to_fit` will try.
const MIN_FIT_QUALITY: f32 = 0.1;

/// Binary search steps for `crop_to_fit` (under 1% quality resolution).
const FIT_ITERATIONS: usize = 8;

/// Builder for cropping identity photos.
///
/// Validates the input format on construction, then decodes, checks, places
/// the face and encodes when [`crop`](Self::crop) is called.
pub struct PhotoCropper {
    input: Vec<u8>,
    settings: CropSettings,
    /// Face supplied by the caller; takes precedence over `detector`.
    face: Option<DetectedFace>,
    /// User-provided face detector, run on a grayscale copy of the input.
    detector: Option<Box<dyn FaceDetector>>,
}

impl PhotoCropper {
    /// Create a new cropper from raw image bytes (JPEG, PNG, or WebP).
    pub fn new(input: Vec<u8>) -> Result<Self, IdCropError> {
        // Validate that the input can be decoded
        render::detect_format(&input)?;

        Ok(Self {
            input,
            settings: CropSettings::default(),
            face: None,
            detector: None,
        })
    }

    /// Use a built-in photo standard.
    ///
    /// Replaces the whole output spec, including the DPI, so call
    /// [`dpi`](Self::dpi) afterwards to print at another resolution.
    pub fn standard(mut self, standard: Standard) -> Self {
        self.settings.spec = standard.spec();
        self
    }

    /// Use a custom physical output spec.
    pub fn output_spec(mut self, spec: OutputSpec) -> Self {
        self.settings.spec = spec;
        self
    }

    /// Set the print resolution (default: 300).
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.settings.spec.dpi = dpi;
        self
    }

    /// Replace all user adjustments at once.
    pub fn params(mut self, params: CropParams) -> Self {
        self.settings.params = params;
        self
    }

    /// Set the head-height factor (default: 1.0, clamped to 0.5–2.0).
    pub fn zoom(mut self, zoom: f64) -> Self {
        self.settings.params.zoom = zoom;
        self
    }

    /// Shift the face by output pixels (clamped to ±200 per axis).
    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.settings.params.offset_x = x;
        self.settings.params.offset_y = y;
        self
    }

    /// Rotate about the canvas center, in degrees (clamped to ±45).
    pub fn rotation(mut self, degrees: f64) -> Self {
        self.settings.params.rotation_deg = degrees;
        self
    }

    /// Override the standard's width / height ratio (clamped to 0.5–2.0).
    pub fn aspect_ratio(mut self, ratio: f64) -> Self {
        self.settings.params.aspect_ratio = Some(ratio);
        self
    }

    /// Level the eye line automatically (default: false).
    pub fn auto_level(mut self, enable: bool) -> Self {
        self.settings.params.auto_level = enable;
        self
    }

    /// Set the output format (default: `OutputFormat::Jpeg`).
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.settings.format = format;
        self
    }

    /// Set the JPEG quality from 0.0 (lowest) to 1.0 (highest). Default: 0.92.
    pub fn quality(mut self, quality: f32) -> Self {
        self.settings.quality = quality;
        self
    }

    /// Set the resolution and tilt limits.
    pub fn validation(mut self, validation: ValidationSettings) -> Self {
        self.settings.validation = validation;
        self
    }

    /// Provide an already detected face, skipping detection.
    pub fn face(mut self, face: DetectedFace) -> Self {
        self.face = Some(face);
        self
    }

    /// Provide a face detector implementation.
    ///
    /// ```no_run
    /// use idcrop::{DetectedFace, FaceDetector, PhotoCropper};
    ///
    /// struct MyDetector;
    /// impl FaceDetector for MyDetector {
    ///     fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<DetectedFace> {
    ///         // Your detection logic here
    ///         vec![]
    ///     }
    /// }
    ///
    /// let bytes = std::fs::read("photo.jpg").unwrap();
    /// let result = PhotoCropper::new(bytes).unwrap()
    ///     .face_detector(Box::new(MyDetector))
    ///     .crop();
    /// ```
    pub fn face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Resolve the draw transform without rendering.
    ///
    /// Cheap when a face was supplied; otherwise the input is decoded and the
    /// detector is run. The face goes through the same frontal check as
    /// [`crop`](Self::crop), but the source resolution is not checked.
    pub fn transform(&self) -> Result<DrawTransform, IdCropError> {
        let face = match &self.face {
            Some(face) => face.clone(),
            None => {
                let decoded = render::decode_image(&self.input)?;
                render::locate_face(&decoded, None, self.detector.as_deref())?
            }
        };
        validate::check_frontal(&face, &self.settings.validation)?;
        resolve_geometry(&face, &self.settings.spec, &self.settings.params)
    }

    /// Crop the photo with the configured settings.
    pub fn crop(self) -> Result<CroppedPhoto, IdCropError> {
        let quality = self.settings.quality;
        if !(0.0..=1.0).contains(&quality) {
            return Err(IdCropError::InvalidQuality(quality));
        }

        render::crop_pipeline(
            &self.input,
            &self.settings,
            self.face.as_ref(),
            self.detector.as_deref(),
        )
    }

    /// Binary-search over quality to encode within a byte budget.
    ///
    /// The canvas is rendered once and re-encoded up to 8 times (10%–100% at
    /// <1% precision). Lossless formats are encoded once. Returns the highest
    /// quality that fits within `max_bytes`, or the minimum-quality result with
    /// `reached_target: false` if the target is unreachable.
    pub fn crop_to_fit(self, max_bytes: usize) -> Result<FitResult, IdCropError> {
        let prepared = render::prepare(
            &self.input,
            &self.settings,
            self.face.as_ref(),
            self.detector.as_deref(),
        )?;
        let original_size = self.input.len();

        if !self.settings.format.is_lossy() {
            let photo = render::finish(&prepared, &self.settings, 1.0, original_size)?;
            let reached_target = photo.data.len() <= max_bytes;
            return Ok(FitResult {
                photo,
                quality_used: 1.0,
                reached_target,
            });
        }

        let mut low: f32 = MIN_FIT_QUALITY;
        let mut high: f32 = 1.0;
        let mut best: Option<(CroppedPhoto, f32)> = None;

        for _ in 0..FIT_ITERATIONS {
            let mid = (low + high) / 2.0;
            let photo = render::finish(&prepared, &self.settings, mid, original_size)?;

            if photo.data.len() <= max_bytes {
                best = Some((photo, mid));
                low = mid;
            } else {
                high = mid;
            }
        }

        if let Some((photo, quality_used)) = best {
            return Ok(FitResult {
                photo,
                quality_used,
                reached_target: true,
            });
        }

        // Even minimum quality exceeds target — return best-effort result
        let photo = render::finish(&prepared, &self.settings, MIN_FIT_QUALITY, original_size)?;
        let reached_target = photo.data.len() <= max_bytes;
        Ok(FitResult {
            photo,
            quality_used: MIN_FIT_QUALITY,
            reached_target,
        })
    }
}
