//! Error types for the voxchat client

use thiserror::Error;

/// Result type alias for voxchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voxchat client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Generation backend error (bad status, malformed stream)
    #[error("backend error: {0}")]
    Backend(String),

    /// Speech capture unavailable or failed
    #[error("capture error: {0}")]
    Capture(String),

    /// Speech synthesis unavailable or failed
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Conversation history ordering violation
    #[error("conversation error: {0}")]
    Conversation(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
