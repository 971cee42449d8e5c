//! Error types for the interview sync layer

use thiserror::Error;

/// Result type alias for interview sync operations
pub type InterviewResult<T> = Result<T, InterviewError>;

/// Errors that can occur while synchronizing an interview session
#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Voice SDK error: {0}")]
    Voice(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<config::ConfigError> for InterviewError {
    fn from(err: config::ConfigError) -> Self {
        InterviewError::Config(err.to_string())
    }
}
