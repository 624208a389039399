//! Error types for the HTTP utilities.
//!
//! # Design
//! Transport failures are passed through untouched so callers can inspect the
//! underlying `reqwest::Error`. A non-2xx response gets its own `Status`
//! variant carrying the status code. Validation failures (bad URL, bad header,
//! missing file name, unknown MIME type, content type without a body) are
//! raised before any network I/O happens.

use std::io;
use std::path::PathBuf;

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// Errors returned by `HttpClient` operations in both calling modes.
#[derive(Debug, Error)]
pub enum HttpError {
    /// DNS, connect, TLS or protocol failure reported by the transport.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status outside the 2xx range.
    #[error("HTTP {} {} for {url}", .status.as_u16(), .status.canonical_reason().unwrap_or("Unknown Status"))]
    Status { status: StatusCode, url: Url },

    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("MIME type not found for file: {file_name}")]
    MimeTypeNotFound { file_name: String },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The download destination already exists; nothing was written.
    #[error("destination already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl HttpError {
    /// Numeric status of a non-success response, or of a transport error that
    /// carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(status.as_u16()),
            HttpError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for failures raised before the request reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HttpError::InvalidUrl { .. }
                | HttpError::InvalidHeader { .. }
                | HttpError::InvalidArgument(_)
                | HttpError::MimeTypeNotFound { .. }
                | HttpError::Unsupported(_)
        )
    }

    pub(crate) fn header(name: impl Into<String>, reason: impl ToString) -> Self {
        HttpError::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
