#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the `tokenizers` crate.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("token {0:?} is not in the vocabulary")]
    MissingToken(String),

    #[error("block length must be greater than zero")]
    ZeroBlockLength,

    #[error("no input found: {0}")]
    NoInput(String),
}

pub type Result<T> = std::result::Result<T, TokenizeError>;
