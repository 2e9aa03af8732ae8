//! Error types for bundle-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Fetch, Run, Database, Config)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for bundle-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch_size")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Fetching or resolving a bundle failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Run lifecycle error
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Record cannot be processed (no group key, no bundle references)
    #[error("record {id} is not downloadable: {reason}")]
    NotDownloadable {
        /// The record ID
        id: i64,
        /// Why the record was rejected
        reason: String,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors raised while resolving a reference or fetching one file
#[derive(Debug, Error)]
pub enum FetchError {
    /// The reference matches neither the grouped nor the single shape
    #[error("malformed bundle reference {reference:?}: {reason}")]
    MalformedReference {
        /// The offending reference
        reference: String,
        /// What was wrong with it
        reason: String,
    },

    /// The CDN answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// The requested URL
        url: String,
        /// The response status code
        status: u16,
    },

    /// The request could not be completed (connect, TLS, body read)
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The requested URL
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// The request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// The requested URL
        url: String,
    },

    /// The fetch was abandoned because the run was cancelled
    #[error("fetch of {url} cancelled")]
    Cancelled {
        /// The requested URL
        url: String,
    },

    /// Writing the file to disk failed
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Destination (or temporary) path
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    pub(crate) fn write(path: &std::path::Path, e: std::io::Error) -> Self {
        FetchError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}

/// Run lifecycle errors
#[derive(Debug, Error)]
pub enum RunError {
    /// A bulk run is already in progress
    #[error("a download run is already in progress")]
    AlreadyRunning,

    /// Counting eligible records failed, so the run could not be sized
    #[error("failed to count eligible records: {0}")]
    CountFailed(String),

    /// The run task panicked
    #[error("download run aborted: {0}")]
    Panicked(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "already_running",
///     "message": "run error: a download run is already in progress"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "already_running")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::NotDownloadable { .. } => 400,

            Error::NotFound(_) => 404,

            // 409 Conflict - a run is already active
            Error::Run(RunError::AlreadyRunning) => 409,

            Error::Fetch(FetchError::MalformedReference { .. }) => 422,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Run(RunError::CountFailed(_)) => 500,
            Error::Run(RunError::Panicked(_)) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - CDN errors
            Error::Fetch(_) => 502,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Fetch(e) => match e {
                FetchError::MalformedReference { .. } => "malformed_reference",
                FetchError::HttpStatus { .. } => "http_status",
                FetchError::Transport { .. } => "transport_error",
                FetchError::Timeout { .. } => "timeout",
                FetchError::Cancelled { .. } => "cancelled",
                FetchError::Write { .. } => "write_error",
            },
            Error::Run(e) => match e {
                RunError::AlreadyRunning => "already_running",
                RunError::CountFailed(_) => "count_failed",
                RunError::Panicked(_) => "run_panicked",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::NotDownloadable { .. } => "not_downloadable",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::NotDownloadable { id, .. } => Some(serde_json::json!({ "record_id": id })),
            Error::Fetch(FetchError::HttpStatus { url, status }) => {
                Some(serde_json::json!({ "url": url, "status": status }))
            }
            Error::Fetch(FetchError::MalformedReference { reference, .. }) => {
                Some(serde_json::json!({ "reference": reference }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
