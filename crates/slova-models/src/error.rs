#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("eval fraction must be within [0, 1], got {0}")]
    InvalidFraction(f64),

    #[error("duplicate preset name: {0}")]
    DuplicatePreset(String),

    #[error("no model presets configured")]
    NoPresets,

    #[error("invalid preset {name}: {reason}")]
    InvalidPreset { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
