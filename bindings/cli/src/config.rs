//! Settings file loading and CLI override logic.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use idcrop::{
    standard_by_name, CropParams, DetectedFace, FaceRecord, IdCropError, OutputFormat,
    OutputSpec, Standard, ValidationSettings,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::args::CropArgs;

/// Everything a crop run can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CropSettings {
    pub standard: Standard,
    /// Custom physical spec; replaces `standard` when present.
    pub output_spec: Option<OutputSpec>,
    pub dpi: Option<u32>,
    pub params: CropParams,
    pub format: Option<OutputFormat>,
    pub quality: Option<f32>,
    pub max_bytes: Option<usize>,
    pub validation: ValidationSettings,
}

impl CropSettings {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))
    }

    /// Physical spec after the standard, custom spec and DPI are combined.
    pub fn resolved_spec(&self) -> OutputSpec {
        let spec = self
            .output_spec
            .clone()
            .unwrap_or_else(|| self.standard.spec());
        match self.dpi {
            Some(dpi) => spec.with_dpi(dpi),
            None => spec,
        }
    }
}

/// Load settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<CropSettings> {
    match config_path {
        Some(path) => {
            let settings = CropSettings::load_from_path(path)?;
            info!("Loaded settings from {}", path.display());
            Ok(settings)
        }
        None => Ok(CropSettings::default()),
    }
}

/// Apply command-line arguments over loaded or default settings.
pub fn apply_cli_overrides(settings: &mut CropSettings, args: &CropArgs) -> Result<()> {
    if let Some(name) = args.standard.as_deref() {
        settings.standard = standard_by_name(name)
            .with_context(|| format!("unknown standard '{name}' (see --list-standards)"))?;
        settings.output_spec = None;
    }
    if let Some(dpi) = args.dpi {
        settings.dpi = Some(dpi);
    }

    if let Some(zoom) = args.zoom {
        settings.params.zoom = zoom;
    }
    if let Some(x) = args.offset_x {
        settings.params.offset_x = x;
    }
    if let Some(y) = args.offset_y {
        settings.params.offset_y = y;
    }
    if let Some(rotation) = args.rotation {
        settings.params.rotation_deg = rotation;
    }
    if let Some(ratio) = args.aspect_ratio {
        settings.params.aspect_ratio = Some(ratio);
    }
    if args.auto_level {
        settings.params.auto_level = true;
    }

    if let Some(format) = args.format.as_deref() {
        settings.format = Some(format.parse().map_err(anyhow::Error::msg)?);
    } else if settings.format.is_none() {
        settings.format = args.output.as_deref().and_then(format_from_path);
    }
    if let Some(quality) = args.quality {
        settings.quality = Some(quality);
    }
    if let Some(max_bytes) = args.max_bytes {
        settings.max_bytes = Some(max_bytes);
    }

    if let Some(min) = args.min_resolution {
        settings.validation.min_width = min;
        settings.validation.min_height = min;
    }
    if let Some(tilt) = args.max_tilt {
        settings.validation.max_tilt_deg = tilt;
    }
    Ok(())
}

/// Output format implied by a file extension, if it names one.
pub fn format_from_path(path: &Path) -> Option<OutputFormat> {
    path.extension()?.to_str()?.parse().ok()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FaceFile {
    One(FaceRecord),
    Many(Vec<FaceRecord>),
}

/// Parse a detection file and pick the face to crop around.
pub fn parse_faces(json: &str) -> Result<DetectedFace> {
    let records = match serde_json::from_str(json).context("invalid face JSON")? {
        FaceFile::One(record) => vec![record],
        FaceFile::Many(records) => records,
    };
    let faces = records
        .into_iter()
        .map(DetectedFace::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    idcrop::select_primary_face(faces).ok_or_else(|| IdCropError::NoFaceFound.into())
}

/// Read and parse a detection file.
pub fn load_face(path: &Path) -> Result<DetectedFace> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read face file {}", path.display()))?;
    parse_faces(&contents).with_context(|| format!("no usable face in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use idcrop::Point;

    fn args(extra: &[&str]) -> CropArgs {
        let mut argv = vec!["idcrop", "-i", "in.png", "--face", "face.json", "-o", "out.png"];
        argv.extend_from_slice(extra);
        CropArgs::parse_from(argv)
    }

    #[test]
    fn settings_file_fields_are_optional() {
        let settings: CropSettings =
            serde_json::from_str(r#"{"standard": "us-2x2", "params": {"zoom": 1.2}}"#).unwrap();
        assert_eq!(settings.standard, Standard::Us2x2);
        assert_eq!(settings.params.zoom, 1.2);
        assert_eq!(settings.validation, ValidationSettings::default());
        assert!(settings.format.is_none());
    }

    #[test]
    fn flags_override_settings() {
        let mut settings = CropSettings {
            standard: Standard::Us2x2,
            dpi: Some(600),
            quality: Some(0.5),
            ..Default::default()
        };
        apply_cli_overrides(
            &mut settings,
            &args(&["--standard", "ICAO", "--offset-y", "-15", "-q", "0.8"]),
        )
        .unwrap();
        assert_eq!(settings.standard, Standard::Icao35x45);
        assert_eq!(settings.dpi, Some(600));
        assert_eq!(settings.params.offset_y, -15.0);
        assert_eq!(settings.quality, Some(0.8));
    }

    #[test]
    fn format_follows_output_extension() {
        let mut settings = CropSettings::default();
        apply_cli_overrides(&mut settings, &args(&[])).unwrap();
        assert_eq!(settings.format, Some(OutputFormat::Png));

        let mut settings = CropSettings::default();
        apply_cli_overrides(&mut settings, &args(&["--format", "webp"])).unwrap();
        assert_eq!(settings.format, Some(OutputFormat::Webp));
    }

    #[test]
    fn unknown_standard_is_an_error() {
        let mut settings = CropSettings::default();
        let err = apply_cli_overrides(&mut settings, &args(&["--standard", "moon"])).unwrap_err();
        assert!(err.to_string().contains("moon"));
    }

    #[test]
    fn resolved_spec_applies_dpi() {
        let settings = CropSettings {
            dpi: Some(600),
            ..Default::default()
        };
        assert_eq!(settings.resolved_spec().pixel_size(), (827, 1063));
    }

    #[test]
    fn face_file_accepts_array_of_detector_records() {
        let mut points = vec![[100.0, 150.0]; 68];
        points[8] = [100.0, 200.0];
        points[30] = [100.0, 160.0];
        for p in &mut points[36..=41] {
            *p = [80.0, 130.0];
        }
        for p in &mut points[42..=47] {
            *p = [120.0, 130.0];
        }
        let json = serde_json::json!([
            {"box": {"x": 0, "y": 0, "width": 10, "height": 10, "score": 0.2},
             "landmarks": points},
            {"box": {"x": 50, "y": 80, "width": 100, "height": 120, "score": 0.9},
             "landmarks": points},
        ]);
        let face = parse_faces(&json.to_string()).unwrap();
        assert_eq!(face.bounds.confidence, 0.9);
        assert_eq!(face.landmarks.chin, Point::new(100.0, 200.0));
        assert_eq!(face.landmarks.left_eye, Point::new(80.0, 130.0));
    }

    #[test]
    fn empty_face_array_is_no_face() {
        let err = parse_faces("[]").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IdCropError>(),
            Some(IdCropError::NoFaceFound)
        ));
    }
}
