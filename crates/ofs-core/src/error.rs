//! Error types module
//!
//! Request-level failures are unified under `AppError`. Each variant corresponds to one
//! terminal failure state of a `save` request, so callers can map it to a response
//! without inspecting messages. Backend-level failures live in `ofs-storage` and are
//! converted into `AppError::PrimaryPersist` by the persistence coordinator.

use crate::keygen::KeyGenError;
use crate::models::UnsupportedMediaType;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures caused by a third party
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DECODE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unable to decode payload: {0}")]
    Decode(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Primary storage write failed: {0}")]
    PrimaryPersist(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<UnsupportedMediaType> for AppError {
    fn from(err: UnsupportedMediaType) -> Self {
        AppError::UnsupportedMediaType(err.0)
    }
}

impl From<KeyGenError> for AppError {
    fn from(err: KeyGenError) -> Self {
        AppError::Internal(format!("Key generation failed: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Provide a data URI or an http(s) URL in the `data` field"),
            false,
            LogLevel::Debug,
        ),
        AppError::Decode(_) => (
            400,
            "DECODE_ERROR",
            false,
            Some("Send data as data:<media type>;base64,<payload>"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Use image/png, image/jpeg or image/gif"),
            false,
            LogLevel::Debug,
        ),
        AppError::RemoteFetch(_) => (
            502,
            "REMOTE_FETCH_ERROR",
            true,
            Some("Check that the URL is reachable and returns an image"),
            false,
            LogLevel::Warn,
        ),
        AppError::PrimaryPersist(_) => (
            503,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Variant name, used as the `error_type` log field and in non-production responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Decode(_) => "Decode",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::RemoteFetch(_) => "RemoteFetch",
            AppError::PrimaryPersist(_) => "PrimaryPersist",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "InternalWithSource",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Decode(ref msg) => format!("Unable to decode payload: {}", msg),
            AppError::UnsupportedMediaType(ref media_type) => {
                format!("Unsupported media type: {}", media_type)
            }
            AppError::RemoteFetch(ref msg) => format!("Unable to fetch remote content: {}", msg),
            AppError::PrimaryPersist(_) => "Failed to store file".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
