//! Transport and configuration plumbing shared by the domains.

pub mod api_client;
pub mod config;
pub mod errors;

pub use api_client::{ApiClient, AuthContext};
pub use config::{ClientConfig, ConfigError};
pub use errors::ApiError;
