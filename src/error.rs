use thiserror::Error;

#[derive(Error, Debug)]
pub enum GranaryError {
    #[error("Malformed input: {0}")]
    Format(String),

    #[error("No caption file for audio: {0}")]
    MissingCaption(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, GranaryError>;
