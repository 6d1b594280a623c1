//! Command-line argument definitions for idcrop.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Crop a photo to an identity-document standard around a detected face.
#[derive(Debug, Parser)]
#[command(name = "idcrop", author, version, about)]
pub struct CropArgs {
    /// Source image (JPEG, PNG or WebP).
    #[arg(short, long, required_unless_present = "list_standards")]
    pub input: Option<PathBuf>,

    /// Face detection JSON: one face or an array of faces.
    #[arg(long, required_unless_present = "list_standards")]
    pub face: Option<PathBuf>,

    /// Where to write the cropped photo.
    #[arg(
        short,
        long,
        required_unless_present_any = ["list_standards", "print_transform"]
    )]
    pub output: Option<PathBuf>,

    /// Optional settings JSON; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Photo standard (icao-35x45, us-2x2, china-33x48, canada-50x70).
    #[arg(short, long)]
    pub standard: Option<String>,

    /// Print resolution.
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Head size adjustment (0.5 - 2.0).
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Horizontal shift in output pixels (-200 - 200).
    #[arg(long, allow_negative_numbers = true)]
    pub offset_x: Option<f64>,

    /// Vertical shift in output pixels (-200 - 200).
    #[arg(long, allow_negative_numbers = true)]
    pub offset_y: Option<f64>,

    /// Extra rotation in degrees (-45 - 45).
    #[arg(long, allow_negative_numbers = true)]
    pub rotation: Option<f64>,

    /// Override the standard's width/height ratio (0.5 - 2.0).
    #[arg(long)]
    pub aspect_ratio: Option<f64>,

    /// Rotate so the eyes sit on a horizontal line.
    #[arg(long, action = ArgAction::SetTrue)]
    pub auto_level: bool,

    /// Output format (jpeg, png, webp). Defaults to the output extension.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Encoder quality for JPEG (0.0 - 1.0).
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Search for the highest quality that fits in this many bytes.
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Smallest accepted source width and height (pixels).
    #[arg(long, value_name = "PX")]
    pub min_resolution: Option<u32>,

    /// Largest accepted eye-line tilt (degrees).
    #[arg(long)]
    pub max_tilt: Option<f64>,

    /// Print the resolved draw transform as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub print_transform: bool,

    /// List the built-in standards and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub list_standards: bool,
}
