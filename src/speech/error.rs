//! Speech error types

use thiserror::Error;

/// Speech service error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SpeechError {
    pub kind: SpeechErrorKind,
    pub message: String,
}

impl SpeechError {
    pub fn new(kind: SpeechErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(SpeechErrorKind::Connection, message)
    }

    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::new(SpeechErrorKind::ResponseShape, message)
    }

    pub fn artifact_missing(message: impl Into<String>) -> Self {
        Self::new(SpeechErrorKind::ArtifactMissing, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(SpeechErrorKind::Failed, message)
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        SpeechError::connection(format!("Request failed: {e}"))
    }
}

/// The upstream services fail in observably different ways; each kind gets
/// its own user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Space unreachable at startup, transport error, or non-2xx status
    Connection,
    /// The payload did not have the expected shape
    ResponseShape,
    /// A handle was resolved but no file exists behind it
    ArtifactMissing,
    /// Upstream prediction error or local I/O failure
    Failed,
}
