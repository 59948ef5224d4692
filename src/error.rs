//! Error taxonomy for a live voice session.
//!
//! Fatal variants end the session (Error state plus full teardown).
//! [`LiveError::InvalidPayload`] is local: the offending chunk is dropped
//! and the session keeps running.

use thiserror::Error;

pub type LiveResult<T> = std::result::Result<T, LiveError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiveError {
    /// No service credential configured. Pre-flight, leaves the session Disconnected.
    #[error("API Key not found in environment.")]
    MissingCredential,

    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("invalid audio payload: {0}")]
    InvalidPayload(String),
}

impl LiveError {
    /// Whether this error must terminate the running session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LiveError::InvalidPayload(_))
    }

    /// Short message for the UI's error banner.
    pub fn user_message(&self) -> String {
        match self {
            LiveError::MissingCredential => "API Key not found in environment.".to_string(),
            LiveError::MicrophoneUnavailable(_) => "Microphone access required.".to_string(),
            LiveError::TransportError(_) => "Connection error occurred.".to_string(),
            LiveError::OutputUnavailable(reason) => format!("Failed to start session: {reason}"),
            LiveError::InvalidPayload(reason) => format!("Invalid audio payload: {reason}"),
        }
    }
}
