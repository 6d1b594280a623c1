use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdCropError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("image resolution {width}x{height} is below the minimum of {min_width}x{min_height}")]
    ResolutionTooLow {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("no face found in image")]
    NoFaceFound,

    #[error("no face supplied and no face detector configured")]
    NoFaceSource,

    #[error("face is not frontal enough: eye line tilted {angle:.1}° (max {max:.1}°)")]
    NotFrontal { angle: f64, max: f64 },

    #[error("invalid landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("face geometry is degenerate: {0}")]
    DegenerateFace(String),

    #[error("invalid output spec: {0}")]
    InvalidOutputSpec(String),

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),
}
