//! Transport error types
//!
//! Every failure the HTTP layer can produce, before any domain meaning is
//! attached to it.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL is not a valid absolute URL
    #[error("Invalid base URL '{url}'")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// No response was received (connection refused, DNS, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error(
        "Request failed with status {status}: {}",
        .message.as_deref().unwrap_or("no details")
    )]
    HttpStatus {
        status: StatusCode,
        /// Backend-supplied `message`, if the body carried one
        message: Option<String>,
        /// Flattened field-level validation messages
        field_errors: Vec<String>,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// A 2xx body did not match the endpoint's schema
    #[error("Unexpected response body from {endpoint}")]
    Schema {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// An upload was given a MIME type that does not parse
    #[error("Invalid MIME type '{mime}'")]
    InvalidMime {
        mime: String,
        #[source]
        source: reqwest::Error,
    },

    /// A token could not be encoded as a header value
    #[error("Invalid header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ApiError {
    /// HTTP status, for errors that got as far as a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }

    /// The backend's own `message`, if it sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &[String] {
        match self {
            ApiError::HttpStatus { field_errors, .. } => field_errors,
            _ => &[],
        }
    }

    /// A non-2xx response that carried per-field validation messages.
    pub fn is_validation(&self) -> bool {
        !self.field_errors().is_empty()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}
