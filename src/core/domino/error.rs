use thiserror::Error;

#[derive(Debug, Error)]
pub enum DominoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Empty region {width}x{height} at ({x}, {y})")]
    EmptyRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Model load failed: {0}")]
    ModelLoadFailed(String),
    #[error("Inference backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Session lock poisoned")]
    LockPoisoned,
}
