//! Error types for the try-on core.
//!
//! Failures are classified where they originate (the generation gateway and
//! the persistent store). Downstream code decides presentation from
//! [`TryOnError::kind`] and never by looking at message text.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the try-on core.
#[derive(Debug, Error)]
pub enum TryOnError {
    // Generation errors
    #[error("Request was blocked ({reason}): {message}")]
    Blocked { reason: String, message: String },

    #[error("The model did not return an image: {message}")]
    NoImageReturned { message: String },

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status, when the failure came back as a response
        status: Option<u16>,
    },

    #[error("Unsupported MIME type: {mime_type}")]
    UnsupportedInput { mime_type: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Database schema version {found} is newer than supported version {expected}")]
    SchemaTooNew { found: i64, expected: i64 },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Image error: {message}")]
    Image {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for try-on operations.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Coarse classification used by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Blocked,
    NoImageReturned,
    Transport,
    UnsupportedInput,
    Validation,
    Storage,
    Internal,
}

/// A user-facing rendering of a failure, kept as session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<std::io::Error> for TryOnError {
    fn from(err: std::io::Error) -> Self {
        TryOnError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TryOnError {
    fn from(err: serde_json::Error) -> Self {
        TryOnError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for TryOnError {
    fn from(err: rusqlite::Error) -> Self {
        TryOnError::Storage {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for TryOnError {
    fn from(err: reqwest::Error) -> Self {
        TryOnError::Transport {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

impl From<image::ImageError> for TryOnError {
    fn from(err: image::ImageError) -> Self {
        TryOnError::Image {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl TryOnError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        TryOnError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TryOnError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a storage error without an underlying SQLite cause.
    pub fn storage(message: impl Into<String>) -> Self {
        TryOnError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Classify this error into the presentation taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TryOnError::Blocked { .. } => ErrorKind::Blocked,
            TryOnError::NoImageReturned { .. } => ErrorKind::NoImageReturned,
            TryOnError::Transport { .. } => ErrorKind::Transport,
            // An undecodable payload is unsupported content, whichever side produced it
            TryOnError::UnsupportedInput { .. } | TryOnError::Image { .. } => {
                ErrorKind::UnsupportedInput
            }
            TryOnError::Validation { .. } => ErrorKind::Validation,
            TryOnError::Storage { .. } | TryOnError::SchemaTooNew { .. } | TryOnError::Io { .. } => {
                ErrorKind::Storage
            }
            TryOnError::Json { .. } | TryOnError::Config { .. } | TryOnError::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether re-invoking the same operation may succeed.
    ///
    /// Nothing in the core retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TryOnError::Transport { .. } | TryOnError::NoImageReturned { .. }
        )
    }

    /// Render the single message shown to the user.
    ///
    /// `context` names the operation that failed, e.g. "Failed to change pose".
    pub fn user_message(&self, context: &str) -> String {
        match self {
            TryOnError::Transport { .. } => format!(
                "{context}. A network error occurred while contacting the image model. \
                 Please check your internet connection and try again."
            ),
            TryOnError::UnsupportedInput { mime_type } => format!(
                "File type '{mime_type}' is not supported. Please use a format like PNG, JPEG, or WEBP."
            ),
            TryOnError::Image { .. } => {
                "Unsupported file format. Please use an image format like PNG, JPEG, or WEBP."
                    .to_string()
            }
            TryOnError::Blocked { reason, .. } => format!(
                "{context}. The request was blocked by the content-safety filter ({reason}). \
                 Please try a different image."
            ),
            TryOnError::NoImageReturned { message } => {
                format!("{context}. The model did not return an image. {message}")
            }
            TryOnError::Validation { message, .. } => message.clone(),
            other => format!("{context}. {other}"),
        }
    }

    /// Build the session-state notice for this error.
    pub fn notice(&self, context: &str) -> ErrorNotice {
        ErrorNotice {
            kind: self.kind(),
            message: self.user_message(context),
        }
    }
}
