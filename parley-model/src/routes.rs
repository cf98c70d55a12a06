//! Backend route definitions, relative to the configured API base URL.

/// Authentication endpoints.
pub mod auth {
    /// `POST` account creation.
    pub const REGISTER: &str = "/register";
    /// `POST` credential exchange.
    pub const LOGIN: &str = "/login";
    /// `POST` server-side token revocation.
    pub const LOGOUT: &str = "/logout";
}

/// Current-user endpoints.
pub mod user {
    /// `GET` fetches and `PUT` updates the authenticated profile.
    pub const CURRENT: &str = "/user";
    /// `POST` (multipart) uploads and `DELETE` removes the profile picture.
    pub const PROFILE_PICTURE: &str = "/user/profile-picture";
}
