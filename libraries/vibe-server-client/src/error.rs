//! Error types for the Vibe.FM backend client.

use thiserror::Error;

/// Errors that can occur when talking to the Vibe.FM backend.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Request was rejected for missing or expired credentials
    #[error("Authentication required")]
    AuthRequired,

    /// Server answered successfully but reported an error in the body
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

/// Result type for backend client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;
