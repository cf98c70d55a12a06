//! Authentication domain
//!
//! Session lifecycle ([`AuthManager`]), its persistence ([`SessionStore`])
//! and the error types shared with the profile domain.

pub mod errors;
pub mod manager;
pub mod session;
pub mod storage;

pub use errors::{AuthError, AuthResult, StorageError};
pub use manager::{AuthManager, LogoutOutcome};
pub use session::Session;
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore};
