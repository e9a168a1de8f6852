use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera device available")]
    NoDevice,

    #[error("camera access denied: {0}")]
    PermissionDenied(String),

    #[error("failed to open camera: {0}")]
    Open(String),

    #[error("camera stream stopped: {0}")]
    Lost(String),

    #[error("camera support was not compiled in")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum LandmarkError {
    #[error("expected {expected} facial landmarks, detector produced {actual}")]
    TopologyMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("failed to load detector model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("detection failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Landmarks(#[from] LandmarkError),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("canvas has no pixels yet (camera not ready)")]
    EmptyCanvas,

    #[error("canvas buffer is {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with an error body; `message` is its `error` field.
    #[error("{message}")]
    Relay { status: u16, message: String },

    #[error("cannot derive an object name from {0:?}")]
    BadUrl(String),
}
