//! Error types for lectio-rd
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The variants mirror the service's user-visible taxonomy:
//! a missing credential is persistent and non-retryable, service errors
//! are transient, malformed responses are structural failures.

use thiserror::Error;

/// Main error type for the lectio-rd service
#[derive(Error, Debug)]
pub enum Error {
    /// No API access configured; persistent and non-retryable
    #[error("API credential not configured")]
    MissingCredential,

    /// Transient upstream failure (5xx-class, timeouts, transport errors)
    #[error("Service error: {0}")]
    Service(String),

    /// Response parsed but failed structural validation
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// PCM decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Operation not valid in the current playback state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a bounded auto-retry is worthwhile for this error.
    ///
    /// Only chapter-text fetches retry; verse-audio fetches surface the
    /// first failure to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Service(_) | Error::MalformedResponse(_))
    }

    /// Stable machine-readable code for API error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingCredential => "missing_credential",
            Error::Service(_) => "service",
            Error::MalformedResponse(_) => "malformed_response",
            Error::Decode(_) => "decode",
            Error::AudioOutput(_) => "audio_output",
            Error::Playback(_) => "playback",
            Error::InvalidState(_) => "invalid_state",
            Error::Config(_) => "config",
            Error::Http(_) => "http",
            Error::BadRequest(_) => "bad_request",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}

/// Convenience Result type using the lectio-rd Error
pub type Result<T> = std::result::Result<T, Error>;
