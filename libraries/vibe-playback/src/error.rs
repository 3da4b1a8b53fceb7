//! Error types for playback synchronization

use thiserror::Error;

/// Playback synchronization errors
#[derive(Debug, Error)]
pub enum PlayerError {
    /// No live device handle (never initialized, still connecting, or torn down)
    #[error("Playback device not initialized")]
    NotInitialized,

    /// The platform SDK failed to load or never became ready
    #[error("Platform SDK unavailable: {0}")]
    SdkUnavailable(String),

    /// The device rejected a request or reported a failure
    #[error("Device error: {0}")]
    Device(String),

    /// Listener registration or removal failed
    #[error("Listener error: {0}")]
    Listener(String),

    /// Credential provider could not supply a token
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for playback synchronization
pub type Result<T> = std::result::Result<T, PlayerError>;
