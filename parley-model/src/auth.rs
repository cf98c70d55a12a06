use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::secret::Secret;
use crate::user::UserProfile;

/// `POST /login` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<Secret>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// `POST /register` body.
///
/// Nothing here is validated locally: a mismatched confirmation is sent as-is
/// and the backend answers with field errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Optional on the form; sent as an empty string when not provided.
    pub phone_number: String,
    pub password: Secret,
    pub password_confirmation: Secret,
}

/// Success body of `/login` and `/register`.
///
/// `access_token` is optional on the wire: a 2xx without a token is still a
/// success, it just does not establish a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthResponse {
    /// The issued bearer token, if the response carried a non-empty one.
    pub fn bearer_token(&self) -> Option<BearerToken> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(BearerToken::new)
    }
}

/// Opaque bearer credential sent as `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Secret);

impl BearerToken {
    pub fn new(token: impl Into<Secret>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.expose_secret()
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.as_str())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken").field(&"[REDACTED]").finish()
    }
}
