//! Profile endpoints for the signed-in user

pub mod draft;
pub mod service;

pub use draft::ProfileDraft;
pub use service::{ProfilePicture, ProfileService};
