use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::{debug, info, warn};

use crate::error::IdCropError;
use crate::face::{DetectedFace, FaceDetector};
use crate::geometry::{resolve_geometry, DrawTransform};
use crate::validate::{check_face, check_frontal, check_resolution};
use crate::{CropSettings, CroppedPhoto, OutputFormat};

/// Fill for canvas pixels the source image does not reach.
pub(crate) const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, IdCropError> {
    image::load_from_memory(input).map_err(|e| IdCropError::DecodeError(e.to_string()))
}

/// Detect the input image format from the raw bytes.
pub(crate) fn detect_format(input: &[u8]) -> Result<ImageFormat, IdCropError> {
    image::guess_format(input).map_err(|e| IdCropError::DecodeError(e.to_string()))
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba: RgbaImage = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

/// Paint `source` onto a fresh canvas through `transform`.
pub(crate) fn render(
    source: &RgbImage,
    transform: &DrawTransform,
) -> Result<RgbImage, IdCropError> {
    let matrix = transform.matrix.to_row_major_3x3();
    let projection = Projection::from_matrix(matrix).ok_or_else(|| {
        IdCropError::DegenerateFace("draw transform is not invertible".to_string())
    })?;

    let mut canvas =
        RgbImage::from_pixel(transform.canvas_width, transform.canvas_height, BACKGROUND);
    warp_into(
        source,
        &projection,
        Interpolation::Bicubic,
        BACKGROUND,
        &mut canvas,
    );
    Ok(canvas)
}

/// Encode the canvas in `format`. `quality` only affects JPEG; `dpi` is
/// recorded in the JPEG header so print dialogs pick the physical size.
pub(crate) fn encode_image(
    image: &RgbImage,
    format: &OutputFormat,
    quality: f32,
    dpi: u32,
) -> Result<Vec<u8>, IdCropError> {
    let mut buffer = Vec::new();
    let (width, height) = image.dimensions();

    match format {
        OutputFormat::Jpeg => {
            let quality_percent = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
            encoder.set_pixel_density(PixelDensity::dpi(dpi.min(u16::MAX as u32) as u16));
            encoder
                .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| IdCropError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| IdCropError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Webp => {
            // image-webp only encodes losslessly; quality is ignored.
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| IdCropError::EncodeError(e.to_string()))?;
        }
    }

    Ok(buffer)
}

/// Find the face to crop around: the supplied one, or the detector's best.
pub(crate) fn locate_face(
    image: &DynamicImage,
    face: Option<&DetectedFace>,
    detector: Option<&dyn FaceDetector>,
) -> Result<DetectedFace, IdCropError> {
    if let Some(face) = face {
        return Ok(face.clone());
    }
    let detector = detector.ok_or(IdCropError::NoFaceSource)?;
    let gray = image.to_luma8();
    let faces = detector.detect(gray.as_raw(), gray.width(), gray.height());
    debug!("detector returned {} face(s)", faces.len());
    check_face(faces)
}

/// Decoded source plus everything resolved from it, ready to encode.
pub(crate) struct Prepared {
    pub(crate) canvas: RgbImage,
    pub(crate) transform: DrawTransform,
    pub(crate) face: DetectedFace,
}

/// decode → resolution check → face → frontal check → geometry → render.
pub(crate) fn prepare(
    input: &[u8],
    settings: &CropSettings,
    face: Option<&DetectedFace>,
    detector: Option<&dyn FaceDetector>,
) -> Result<Prepared, IdCropError> {
    let decoded = decode_image(input)?;
    let (width, height) = (decoded.width(), decoded.height());
    debug!("decoded {width}x{height} source");

    check_resolution(width, height, &settings.validation)?;

    let face = locate_face(&decoded, face, detector)?;
    check_frontal(&face, &settings.validation)?;
    debug!(
        "face at ({:.0}, {:.0}) {:.0}x{:.0}, eye line {:.1}°",
        face.bounds.x,
        face.bounds.y,
        face.bounds.width,
        face.bounds.height,
        face.landmarks.eye_line_angle()
    );

    let transform = resolve_geometry(&face, &settings.spec, &settings.params)?;
    debug!(
        "scale {:.4}, translate ({:.1}, {:.1}), rotation {:.2} rad",
        transform.scale, transform.translate_x, transform.translate_y, transform.rotation_rad
    );
    if !transform.covers(width, height) {
        warn!("source does not fill the output canvas; uncovered area is filled with white");
    }

    let source = flatten_alpha(&decoded);
    let canvas = render(&source, &transform)?;

    Ok(Prepared {
        canvas,
        transform,
        face,
    })
}

/// Encode a prepared canvas into the final photo.
pub(crate) fn finish(
    prepared: &Prepared,
    settings: &CropSettings,
    quality: f32,
    original_size: usize,
) -> Result<CroppedPhoto, IdCropError> {
    let data = encode_image(
        &prepared.canvas,
        &settings.format,
        quality,
        settings.spec.dpi,
    )?;
    info!(
        "cropped to {}x{} at {} dpi ({} bytes)",
        prepared.canvas.width(),
        prepared.canvas.height(),
        settings.spec.dpi,
        data.len()
    );

    Ok(CroppedPhoto {
        data,
        format: settings.format.clone(),
        width: prepared.canvas.width(),
        height: prepared.canvas.height(),
        dpi: settings.spec.dpi,
        original_size,
        transform: prepared.transform.clone(),
        face: prepared.face.clone(),
    })
}

/// Full crop pipeline: prepare, then encode once at the configured quality.
pub(crate) fn crop_pipeline(
    input: &[u8],
    settings: &CropSettings,
    face: Option<&DetectedFace>,
    detector: Option<&dyn FaceDetector>,
) -> Result<CroppedPhoto, IdCropError> {
    let prepared = prepare(input, settings, face, detector)?;
    finish(&prepared, settings, settings.quality, input.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{FaceBounds, Landmarks, Point};
    use crate::params::CropParams;
    use crate::standard::Standard;
    use crate::validate::ValidationSettings;

    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

    fn make_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = make_test_rgb(width, height);
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    fn centered_face(width: f64, height: f64) -> DetectedFace {
        let (cx, cy) = (width / 2.0, height / 2.0);
        DetectedFace {
            bounds: FaceBounds {
                x: cx - 100.0,
                y: cy - 100.0,
                width: 200.0,
                height: 240.0,
                confidence: 0.95,
            },
            landmarks: Landmarks {
                left_eye: Point::new(cx - 45.0, cy - 20.0),
                right_eye: Point::new(cx + 45.0, cy - 20.0),
                nose_tip: Point::new(cx, cy + 30.0),
                chin: Point::new(cx, cy + 140.0),
            },
        }
    }

    fn settings(format: OutputFormat) -> CropSettings {
        CropSettings {
            spec: Standard::Icao35x45.spec(),
            params: CropParams::default(),
            format,
            quality: 0.9,
            validation: ValidationSettings::default(),
        }
    }

    #[test]
    fn encode_jpeg_produces_valid_output() {
        let img = make_test_rgb(48, 64);
        let data = encode_image(&img, &OutputFormat::Jpeg, 0.8, 300).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_jpeg_records_dpi() {
        let img = make_test_rgb(48, 64);
        let data = encode_image(&img, &OutputFormat::Jpeg, 0.8, 300).unwrap();
        // JFIF APP0: "JFIF\0", version (2), units (1 = dpi), x density, y density
        let jfif = data
            .windows(5)
            .position(|w| w == b"JFIF\0")
            .expect("JFIF segment");
        let units = data[jfif + 7];
        let x_density = u16::from_be_bytes([data[jfif + 8], data[jfif + 9]]);
        assert_eq!(units, 1);
        assert_eq!(x_density, 300);
    }

    #[test]
    fn encode_png_and_webp_produce_valid_output() {
        let img = make_test_rgb(48, 64);
        let png = encode_image(&img, &OutputFormat::Png, 0.8, 300).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let webp = encode_image(&img, &OutputFormat::Webp, 0.8, 300).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn flatten_alpha_composites_over_white() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 0]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_alpha_preserves_opaque() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([100, 150, 200, 255]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 150, 200]));
    }

    #[test]
    fn render_fills_uncovered_area_with_background() {
        // Source far too small for the canvas: corners must be background
        let source = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        let face = centered_face(50.0, 50.0);
        let transform =
            resolve_geometry(&face, &Standard::Icao35x45.spec(), &CropParams::default()).unwrap();
        let canvas = render(&source, &transform).unwrap();
        assert_eq!(canvas.dimensions(), (413, 531));
        assert_eq!(canvas.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(canvas.get_pixel(412, 530), &BACKGROUND);
    }

    #[test]
    fn render_copies_source_under_the_face() {
        let source = RgbImage::from_pixel(1000, 1200, Rgb([10, 20, 30]));
        let face = centered_face(1000.0, 1200.0);
        let transform =
            resolve_geometry(&face, &Standard::Icao35x45.spec(), &CropParams::default()).unwrap();
        assert!(transform.covers(1000, 1200));
        let canvas = render(&source, &transform).unwrap();
        let center = canvas.get_pixel(206, 265);
        for (got, want) in center.0.iter().zip([10u8, 20, 30]) {
            assert!((*got as i16 - want as i16).abs() <= 1, "{center:?}");
        }
    }

    #[test]
    fn pipeline_output_size_ignores_source_size() {
        for (w, h) in [(800, 800), (1200, 1600), (2000, 900)] {
            let png = make_test_png(w, h);
            let face = centered_face(w as f64, h as f64);
            let photo =
                crop_pipeline(&png, &settings(OutputFormat::Png), Some(&face), None).unwrap();
            assert_eq!((photo.width, photo.height), (413, 531), "source {w}x{h}");
            assert_eq!(photo.original_size, png.len());
        }
    }

    #[test]
    fn pipeline_without_face_source_fails() {
        let png = make_test_png(800, 800);
        let err = crop_pipeline(&png, &settings(OutputFormat::Jpeg), None, None).unwrap_err();
        assert!(matches!(err, IdCropError::NoFaceSource));
    }

    #[test]
    fn pipeline_rejects_small_source() {
        let png = make_test_png(300, 400);
        let face = centered_face(300.0, 400.0);
        let err =
            crop_pipeline(&png, &settings(OutputFormat::Jpeg), Some(&face), None).unwrap_err();
        assert!(matches!(err, IdCropError::ResolutionTooLow { .. }));
    }

    #[test]
    fn invalid_input_returns_decode_error() {
        let err = crop_pipeline(b"not an image", &settings(OutputFormat::Jpeg), None, None)
            .unwrap_err();
        assert!(matches!(err, IdCropError::DecodeError(_)));
    }
}
