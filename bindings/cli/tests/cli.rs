use std::path::Path;
use std::process::{Command, Output};

use image::{Rgb, RgbImage};

const FACE_JSON: &str = r#"{
    "bounds": {"x": 300, "y": 300, "width": 200, "height": 240, "confidence": 0.97},
    "landmarks": {
        "leftEye": {"x": 355, "y": 380},
        "rightEye": {"x": 445, "y": 380},
        "noseTip": {"x": 400, "y": 440},
        "chin": {"x": 400, "y": 560}
    }
}"#;

fn write_fixture(dir: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(dir.join("photo.png")).unwrap();
    std::fs::write(dir.join("face.json"), FACE_JSON).unwrap();
}

fn idcrop(dir: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_idcrop"))
        .current_dir(dir)
        .args(["--input", "photo.png", "--face", "face.json"])
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn writes_photo_at_standard_size() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);

    let out = idcrop(dir.path(), &["--output", "out.jpg"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let photo = image::open(dir.path().join("out.jpg")).unwrap();
    assert_eq!((photo.width(), photo.height()), (413, 531));
}

#[test]
fn standard_and_format_flags_are_honoured() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);

    let out = idcrop(
        dir.path(),
        &["-o", "out.bin", "--standard", "us-2x2", "--format", "png"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let data = std::fs::read(dir.path().join("out.bin")).unwrap();
    assert_eq!(&data[1..4], b"PNG");
    let photo = image::load_from_memory(&data).unwrap();
    assert_eq!((photo.width(), photo.height()), (600, 600));
}

#[test]
fn config_file_is_overridden_by_flags() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"standard": "canada-50x70", "dpi": 150, "format": "png"}"#,
    )
    .unwrap();

    let out = idcrop(
        dir.path(),
        &["-o", "out.png", "--config", "settings.json", "--dpi", "300"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let photo = image::open(dir.path().join("out.png")).unwrap();
    assert_eq!((photo.width(), photo.height()), (591, 827));
}

#[test]
fn print_transform_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);

    let out = idcrop(dir.path(), &["--print-transform", "--offset-x", "-500"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let transform: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(transform["canvasWidth"], 413);
    assert_eq!(transform["canvasHeight"], 531);
    assert!(transform["scale"].as_f64().unwrap() > 0.0);
}

#[test]
fn max_bytes_limits_output() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);

    let out = idcrop(dir.path(), &["-o", "out.jpg", "--max-bytes", "150000"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let size = std::fs::metadata(dir.path().join("out.jpg")).unwrap().len();
    assert!(size <= 150_000);
}

#[test]
fn low_resolution_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 500, 700);

    let out = idcrop(dir.path(), &["-o", "out.jpg"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("resolution"), "{stderr}");
    assert!(!dir.path().join("out.jpg").exists());
}

#[test]
fn min_resolution_flag_relaxes_check() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 500, 700);

    let out = idcrop(dir.path(), &["-o", "out.jpg", "--min-resolution", "400"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn list_standards_needs_no_input() {
    let out = Command::new(env!("CARGO_BIN_EXE_idcrop"))
        .arg("--list-standards")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("icao-35x45"));
    assert!(stdout.contains("413x531"));
    assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn oversized_dpi_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 800, 1000);

    let out = idcrop(dir.path(), &["-o", "out.jpg", "--dpi", "4294967295"]);
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("dpi must be between"), "{stderr}");
    assert!(!dir.path().join("out.jpg").exists());
}
