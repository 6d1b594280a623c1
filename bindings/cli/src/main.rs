mod args;
mod config;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use idcrop::{PhotoCropper, Standard};
use log::{info, warn, LevelFilter};

use crate::args::CropArgs;
use crate::config::{apply_cli_overrides, load_face, load_settings, CropSettings};

/// Initialise `env_logger`, letting `RUST_LOG` override `default_filter`.
fn init_logging(default_filter: LevelFilter) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    // Already initialised in tests.
    let _ = builder.try_init();
}

fn main() -> Result<()> {
    init_logging(LevelFilter::Info);
    let args = CropArgs::parse();

    if args.list_standards {
        let dpi = args.dpi.unwrap_or(idcrop::DEFAULT_DPI);
        for standard in Standard::all() {
            let (width, height) = standard.spec().with_dpi(dpi).pixel_size();
            println!(
                "{:<14} {:>5}x{:<5} @ {dpi} dpi  {}",
                standard.name(),
                width,
                height,
                standard.description()
            );
        }
        return Ok(());
    }

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args)?;

    let (Some(input), Some(face_path)) = (args.input.as_ref(), args.face.as_ref()) else {
        anyhow::bail!("--input and --face are required");
    };

    let bytes =
        fs::read(input).with_context(|| format!("failed to read image {}", input.display()))?;
    let face = load_face(face_path)?;
    let cropper = build_cropper(bytes, &settings)
        .with_context(|| format!("failed to load image {}", input.display()))?
        .face(face);

    if args.print_transform {
        let transform = cropper.transform()?;
        println!("{}", serde_json::to_string_pretty(&transform)?);
    }

    let Some(output) = args.output.as_ref() else {
        return Ok(());
    };

    let (photo, quality) = match settings.max_bytes {
        Some(max_bytes) => {
            let fit = cropper
                .crop_to_fit(max_bytes)
                .with_context(|| format!("failed to crop {}", input.display()))?;
            if !fit.reached_target {
                warn!(
                    "Could not reach {max_bytes} bytes; smallest output is {} bytes",
                    fit.photo.data.len()
                );
            }
            (fit.photo, Some(fit.quality_used))
        }
        None => (
            cropper
                .crop()
                .with_context(|| format!("failed to crop {}", input.display()))?,
            None,
        ),
    };

    fs::write(output, &photo.data)
        .with_context(|| format!("failed to write {}", output.display()))?;

    match quality {
        Some(q) => info!(
            "Wrote {} ({}x{} {}, {} bytes, quality {q:.2})",
            output.display(),
            photo.width,
            photo.height,
            photo.format,
            photo.data.len()
        ),
        None => info!(
            "Wrote {} ({}x{} {}, {} bytes)",
            output.display(),
            photo.width,
            photo.height,
            photo.format,
            photo.data.len()
        ),
    }
    Ok(())
}

fn build_cropper(bytes: Vec<u8>, settings: &CropSettings) -> Result<PhotoCropper> {
    let mut cropper = PhotoCropper::new(bytes)?
        .output_spec(settings.resolved_spec())
        .params(settings.params.clone())
        .validation(settings.validation.clone());
    if let Some(format) = settings.format.clone() {
        cropper = cropper.format(format);
    }
    if let Some(quality) = settings.quality {
        cropper = cropper.quality(quality);
    }
    Ok(cropper)
}
