//! Error types for roster and attendance operations
//!
//! Errors are classified by origin:
//! - Validation: input rejected locally before any network call
//! - Store: realtime database failures (network, permission, decode)
//! - Upload: object storage failures while uploading a player photo
//!
//! Repositories never swallow a failure. They wrap it in [`Error`] with a
//! prefix naming the operation that failed and keep the cause as `source`.

use thiserror::Error;

/// Input that fails a local precondition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Player name is required")]
    MissingName,

    #[error("Jersey number is required")]
    MissingNumber,

    #[error("Jersey number must be a whole number, got {0:?}")]
    InvalidNumber(String),

    #[error("Jersey number must be between 0 and 99, got {0}")]
    NumberOutOfRange(i64),

    #[error("Position is required")]
    MissingPosition,

    #[error("Unknown position {0:?}")]
    UnknownPosition(String),

    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid store path {0:?}")]
    InvalidPath(String),

    #[error("Upload is empty")]
    EmptyUpload,

    #[error("Upload needs a file name")]
    MissingFileName,
}

/// Failure reported by a remote store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed payload at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value at {0} changed since it was read")]
    PreconditionFailed(String),

    #[error("Invalid key in {0}")]
    InvalidPath(String),

    #[error("Live stream error: {0}")]
    Stream(String),

    #[error("Store connection closed")]
    Closed,
}

/// Failure while uploading an asset to object storage.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Object storage response has no download token")]
    MissingToken,

    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),
}

/// Error surfaced to callers of the repositories and use cases.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{context}: {source}")]
    Upload {
        context: &'static str,
        #[source]
        source: UploadError,
    },

    #[error("Failed to save attendance: {date} was changed by someone else, reload and try again")]
    Conflict { date: String },

    #[error("{context}: nothing stored at {path}")]
    NotFound { context: &'static str, path: String },
}

impl Error {
    /// Wrap a store failure with the name of the failing operation.
    pub const fn store(context: &'static str, source: StoreError) -> Self {
        Self::Store { context, source }
    }

    /// Wrap an upload failure with the name of the failing operation.
    pub const fn upload(context: &'static str, source: UploadError) -> Self {
        Self::Upload { context, source }
    }

    /// Returns true if re-submitting the same request may succeed.
    ///
    /// Validation errors need corrected input first, and a missing record
    /// stays missing.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }

    /// Returns true if this is a local validation failure.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_context_and_cause() {
        let err = Error::store(
            "Failed to add player",
            StoreError::Status {
                status: 401,
                body: "Permission denied".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Failed to add player: Store returned 401: Permission denied"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Store returned 401: Permission denied")
        );
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err = Error::from(ValidationError::MissingName);
        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Player name is required");
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = Error::Conflict {
            date: "2024-01-01".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_record_is_not_retryable() {
        let err = Error::NotFound {
            context: "Failed to update player",
            path: "players/p1".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "Failed to update player: nothing stored at players/p1"
        );
    }
}
