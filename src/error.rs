use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Clip overlap on track {track_id}: {message}")]
    Overlap { track_id: Uuid, message: String },
    #[error("Track {0} is locked")]
    LockedTrack(Uuid),
    #[error("Invalid trim window: {0}")]
    InvalidTrim(String),
    #[error("Invalid keyframe: {0}")]
    InvalidKeyframe(String),
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
    #[error("Media error: {0}")]
    Media(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Project error: {0}")]
    Project(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<Box<dyn std::error::Error>> for TimelineError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        TimelineError::Runtime(err.to_string())
    }
}
