use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-reported user profile.
///
/// Every field is optional: the backend omits or nulls fields freely and the
/// client enforces no invariants on them. Fields the client does not model
/// are kept in `extra` so a cached snapshot round-trips what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// "First Last" when either name is set, otherwise the username.
    pub fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.username.clone()
        } else {
            Some(full)
        }
    }
}

/// `PUT /user` body. The edit screen always sends every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub username: String,
    pub email: String,
    pub phone_number: String,
}

impl From<&UserProfile> for UpdateProfileRequest {
    fn from(profile: &UserProfile) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            first_name: field(&profile.first_name),
            last_name: field(&profile.last_name),
            bio: field(&profile.bio),
            username: field(&profile.username),
            email: field(&profile.email),
            phone_number: field(&profile.phone_number),
        }
    }
}

/// `POST /user/profile-picture` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    pub profile_picture_url: String,
}
