use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Snapshot decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SiftError {
    /// Whether the error came from the destination rather than from encoding.
    pub fn is_io(&self) -> bool {
        matches!(self, SiftError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;
