//! Authentication error types
//!
//! Every manager and profile operation returns [`AuthResult`]. The
//! [`AuthError::message`] text is what a screen would show the user.

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::errors::ApiError;

pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const LOGOUT_FAILED: &str = "Logout failed";
pub const GET_USER_FAILED: &str = "Failed to get user";
pub const UPDATE_PROFILE_FAILED: &str = "Failed to update profile";
pub const UPLOAD_PICTURE_FAILED: &str = "Failed to upload profile picture";
pub const REMOVE_PICTURE_FAILED: &str = "Failed to remove profile picture";

/// Main authentication error type
#[derive(Debug, Error)]
pub enum AuthError {
    /// A backend call failed
    #[error("{message}")]
    Request {
        message: String,
        field_errors: Vec<String>,
        #[source]
        source: ApiError,
    },

    /// No bearer token is stored
    #[error("No token found")]
    NoSession,

    /// A stored or issued token cannot be sent as a header
    #[error("Invalid bearer token")]
    InvalidToken(#[source] ApiError),

    /// Session persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored profile snapshot could not be encoded or decoded
    #[error("Invalid profile snapshot")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    /// Wrap a transport failure, preferring the backend's own message over
    /// `fallback`.
    pub(crate) fn request(source: ApiError, fallback: &str) -> Self {
        let message = source
            .backend_message()
            .unwrap_or(fallback)
            .to_string();
        Self::with_message(source, message)
    }

    /// Like [`AuthError::request`], but falls back to the transport error's
    /// own text before `fallback`.
    pub(crate) fn request_verbose(source: ApiError, fallback: &str) -> Self {
        let message = match source.backend_message() {
            Some(message) => message.to_string(),
            None => {
                let text = source.to_string();
                if text.trim().is_empty() {
                    fallback.to_string()
                } else {
                    text
                }
            }
        };
        Self::with_message(source, message)
    }

    fn with_message(source: ApiError, message: String) -> Self {
        AuthError::Request {
            message,
            field_errors: source.field_errors().to_vec(),
            source,
        }
    }

    /// Human-readable description for display.
    pub fn message(&self) -> String {
        match self {
            AuthError::Request { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Flattened field validation messages, in the order the backend sent
    /// them.
    pub fn field_errors(&self) -> &[String] {
        match self {
            AuthError::Request { field_errors, .. } => field_errors,
            _ => &[],
        }
    }

    /// The transport failure behind this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read session file {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session file {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted session file {path}")]
    CorruptedData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
