//! Wire schemas shared by the Parley client crates.
//!
//! Every request and response body the client exchanges with the backend is
//! described here as an explicit serde type, so responses are validated at
//! the boundary instead of being consumed as loose JSON.

pub mod auth;
pub mod error;
pub mod routes;
pub mod secret;
pub mod user;

pub use auth::{AuthResponse, BearerToken, LoginRequest, RegisterRequest};
pub use error::ApiErrorBody;
pub use secret::Secret;
pub use user::{ProfilePictureResponse, UpdateProfileRequest, UserProfile};
