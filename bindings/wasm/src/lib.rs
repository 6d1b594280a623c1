use idcrop::{
    CropParams, DetectedFace, DrawTransform, FaceRecord, IdCropError, OutputFormat, PhotoCropper,
    Standard, ValidationSettings,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Options for a crop, passed as a JavaScript object.
///
/// All fields are optional. Unset fields keep the standard's defaults and
/// the crate's default adjustments.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CropOptions {
    pub standard: Option<String>,
    pub dpi: Option<u32>,
    pub zoom: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub rotation: Option<f64>,
    pub aspect_ratio: Option<f64>,
    pub auto_level: Option<bool>,
    pub format: Option<String>,
    pub quality: Option<f32>,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_tilt: Option<f64>,
}

impl CropOptions {
    fn params(&self) -> CropParams {
        let defaults = CropParams::default();
        CropParams {
            zoom: self.zoom.unwrap_or(defaults.zoom),
            offset_x: self.offset_x.unwrap_or(defaults.offset_x),
            offset_y: self.offset_y.unwrap_or(defaults.offset_y),
            rotation_deg: self.rotation.unwrap_or(defaults.rotation_deg),
            aspect_ratio: self.aspect_ratio,
            auto_level: self.auto_level.unwrap_or(defaults.auto_level),
        }
    }

    fn validation(&self) -> ValidationSettings {
        let defaults = ValidationSettings::default();
        ValidationSettings {
            min_width: self.min_width.unwrap_or(defaults.min_width),
            min_height: self.min_height.unwrap_or(defaults.min_height),
            max_tilt_deg: self.max_tilt.unwrap_or(defaults.max_tilt_deg),
        }
    }
}

fn string_to_standard(name: &str) -> Result<Standard, JsValue> {
    idcrop::standard_by_name(name).ok_or_else(|| {
        make_error(
            "INVALID_OPTIONS",
            &format!("unknown standard: {name}"),
        )
    })
}

fn string_to_format(format: &str) -> Result<OutputFormat, JsValue> {
    format
        .parse()
        .map_err(|e: String| make_error("INVALID_OPTIONS", &e))
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Machine-readable code for each error the UI needs to tell apart.
fn error_code(e: &IdCropError) -> &'static str {
    match e {
        IdCropError::DecodeError(_) => "DECODE_ERROR",
        IdCropError::ZeroDimensions => "ZERO_DIMENSIONS",
        IdCropError::ResolutionTooLow { .. } => "RESOLUTION_TOO_LOW",
        IdCropError::NoFaceFound | IdCropError::NoFaceSource => "NO_FACE",
        IdCropError::NotFrontal { .. } => "NOT_FRONTAL",
        IdCropError::InvalidLandmarks(_) => "INVALID_LANDMARKS",
        IdCropError::DegenerateFace(_) => "DEGENERATE_FACE",
        IdCropError::InvalidOutputSpec(_) => "INVALID_OUTPUT_SPEC",
        IdCropError::EncodeError(_) => "ENCODE_ERROR",
        IdCropError::InvalidQuality(_) => "INVALID_QUALITY",
    }
}

/// Convert an `IdCropError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: IdCropError) -> JsValue {
    make_error(error_code(&e), &e.to_string())
}

fn parse_options(options: JsValue) -> Result<CropOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(CropOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

fn parse_face(face: JsValue) -> Result<DetectedFace, JsValue> {
    if face.is_undefined() || face.is_null() {
        return Err(to_js_error(IdCropError::NoFaceFound));
    }
    let record: FaceRecord = serde_wasm_bindgen::from_value(face)
        .map_err(|e| make_error("INVALID_FACE", &format!("invalid face: {e}")))?;
    DetectedFace::try_from(record).map_err(to_js_error)
}

/// Apply parsed `CropOptions` to a `PhotoCropper`, returning the configured
/// cropper ready for rendering.
fn apply_options(mut cropper: PhotoCropper, opts: &CropOptions) -> Result<PhotoCropper, JsValue> {
    if let Some(ref name) = opts.standard {
        cropper = cropper.standard(string_to_standard(name)?);
    }
    if let Some(dpi) = opts.dpi {
        cropper = cropper.dpi(dpi);
    }
    cropper = cropper.params(opts.params()).validation(opts.validation());
    if let Some(ref fmt) = opts.format {
        cropper = cropper.format(string_to_format(fmt)?);
    }
    if let Some(q) = opts.quality {
        cropper = cropper.quality(q);
    }
    Ok(cropper)
}

fn set(obj: &js_sys::Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    js_sys::Reflect::set(obj, &key.into(), value).map(|_| ())
}

/// Build a plain JS object from a `DrawTransform`.
fn build_transform_object(transform: &DrawTransform) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    set(&obj, "canvasWidth", &JsValue::from(transform.canvas_width))?;
    set(&obj, "canvasHeight", &JsValue::from(transform.canvas_height))?;
    set(&obj, "scale", &JsValue::from(transform.scale))?;
    set(&obj, "translateX", &JsValue::from(transform.translate_x))?;
    set(&obj, "translateY", &JsValue::from(transform.translate_y))?;
    set(&obj, "rotation", &JsValue::from(transform.rotation_rad))?;

    let matrix = js_sys::Float64Array::from(&transform.canvas_matrix()[..]);
    set(&obj, "matrix", &matrix)?;

    let source = match transform.source_rect() {
        Some(rect) => {
            let rect_obj = js_sys::Object::new();
            set(&rect_obj, "x", &JsValue::from(rect.x))?;
            set(&rect_obj, "y", &JsValue::from(rect.y))?;
            set(&rect_obj, "width", &JsValue::from(rect.width))?;
            set(&rect_obj, "height", &JsValue::from(rect.height))?;
            JsValue::from(rect_obj)
        }
        None => JsValue::NULL,
    };
    set(&obj, "sourceRect", &source)?;

    Ok(JsValue::from(obj))
}

/// Build a plain JS object from a `CroppedPhoto`.
fn build_photo_object(photo: &idcrop::CroppedPhoto) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    let data = js_sys::Uint8Array::from(&photo.data[..]);
    set(&obj, "data", &data)?;
    set(&obj, "format", &JsValue::from_str(&photo.format.to_string()))?;
    set(&obj, "mimeType", &JsValue::from_str(photo.format.mime_type()))?;
    set(&obj, "width", &JsValue::from(photo.width))?;
    set(&obj, "height", &JsValue::from(photo.height))?;
    set(&obj, "dpi", &JsValue::from(photo.dpi))?;
    set(&obj, "originalSize", &JsValue::from(photo.original_size as u32))?;
    set(&obj, "transform", &build_transform_object(&photo.transform)?)?;
    Ok(JsValue::from(obj))
}

/// Resolve the draw transform for a detected face without touching pixels.
///
/// Cheap enough to call on every slider change; hand `matrix` to
/// `ctx.setTransform(...)` and draw the source image at the origin.
///
/// @param face - `{bounds|box, landmarks}`; landmarks either named
///   (`leftEye`, `rightEye`, `noseTip`, `chin`) or 68 ordered points
/// @param options - Optional object with fields: standard, dpi, zoom,
///   offsetX, offsetY, rotation, aspectRatio, autoLevel, maxTilt
#[wasm_bindgen(js_name = "resolveTransform")]
pub fn resolve_transform(face: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;
    let face = parse_face(face)?;

    let mut spec = match opts.standard {
        Some(ref name) => string_to_standard(name)?.spec(),
        None => Standard::default().spec(),
    };
    if let Some(dpi) = opts.dpi {
        spec.dpi = dpi;
    }

    idcrop::validate::check_frontal(&face, &opts.validation()).map_err(to_js_error)?;
    let transform = idcrop::resolve_geometry(&face, &spec, &opts.params()).map_err(to_js_error)?;
    build_transform_object(&transform)
}

/// Crop an identity photo around a detected face.
///
/// @param input - Raw image bytes (JPEG, PNG, or WebP)
/// @param face - Detected face, see `resolveTransform`
/// @param options - Optional object; adds format, quality, minWidth,
///   minHeight and maxTilt to the `resolveTransform` fields
#[wasm_bindgen]
pub fn crop(input: Vec<u8>, face: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;
    let face = parse_face(face)?;

    let cropper = PhotoCropper::new(input).map_err(to_js_error)?.face(face);
    let cropper = apply_options(cropper, &opts)?;

    let result = cropper.crop().map_err(to_js_error)?;

    build_photo_object(&result)
}

/// Crop an identity photo and encode it within a byte budget.
///
/// Uses binary search over quality (8 iterations) to find the highest quality
/// that produces output within `max_bytes`.
#[wasm_bindgen(js_name = "cropToFit")]
pub fn crop_to_fit(
    input: Vec<u8>,
    face: JsValue,
    max_bytes: usize,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;
    let face = parse_face(face)?;

    let cropper = PhotoCropper::new(input).map_err(to_js_error)?.face(face);
    let cropper = apply_options(cropper, &opts)?;

    let result = cropper.crop_to_fit(max_bytes).map_err(to_js_error)?;

    let photo_obj = build_photo_object(&result.photo)?;
    let obj = js_sys::Object::new();
    set(&obj, "photo", &photo_obj)?;
    set(&obj, "qualityUsed", &JsValue::from(result.quality_used))?;
    set(&obj, "reachedTarget", &JsValue::from(result.reached_target))?;

    Ok(JsValue::from(obj))
}

/// Output canvas size in pixels for a standard, as `[width, height]`.
#[wasm_bindgen(js_name = "outputSize")]
pub fn output_size(standard: &str, dpi: Option<u32>) -> Result<Vec<u32>, JsValue> {
    let mut spec = string_to_standard(standard)?.spec();
    if let Some(dpi) = dpi {
        spec.dpi = dpi;
    }
    spec.validate().map_err(to_js_error)?;
    let (width, height) = spec.pixel_size();
    Ok(vec![width, height])
}

/// Names of the built-in standards.
#[wasm_bindgen]
pub fn standards() -> Vec<String> {
    Standard::all().iter().map(|s| s.name().to_string()).collect()
}
