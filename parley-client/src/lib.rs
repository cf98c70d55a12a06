//! Parley client library
//!
//! Session-aware access to the Parley messaging backend: an HTTP client bound
//! to one origin, a persisted bearer-token session, and the profile calls
//! made on the session's behalf.
//!
//! Notes
//! - [`AuthManager`] owns the session lifecycle. The [`SessionStore`] is the
//!   source of truth; the [`ApiClient`]'s default `Authorization` header
//!   mirrors it.
//! - Every request names its credentials through [`AuthContext`].

pub mod domains;
pub mod infra;

pub use domains::auth::{
    AuthError, AuthManager, AuthResult, FileSessionStore, LogoutOutcome,
    MemorySessionStore, Session, SessionStore, StorageError,
};
pub use domains::profile::{ProfileDraft, ProfilePicture, ProfileService};
pub use infra::{ApiClient, ApiError, AuthContext, ClientConfig, ConfigError};
