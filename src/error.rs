//! Error taxonomy shared by every layer of the overlay engine

use thiserror::Error;

/// Errors surfaced by the overlay engine
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Property hub unreachable, timed out, or answered with garbage
    #[error("Property source unavailable: {0}")]
    SourceUnavailable(String),

    /// Property, extension, promotion, or tag does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Concurrent modification detected
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Local overlay store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for overlay operations
pub type OverlayResult<T> = Result<T, OverlayError>;

impl OverlayError {
    /// Stable identifier for the error kind, suitable for API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }

    /// Worth retrying as-is
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::Conflict(_))
    }
}

impl From<rusqlite::Error> for OverlayError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(err.to_string())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for OverlayError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("Blocking task failed: {}", err))
    }
}

impl From<reqwest::Error> for OverlayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::SourceUnavailable(format!("request timed out: {}", err))
        } else {
            Self::SourceUnavailable(err.to_string())
        }
    }
}
