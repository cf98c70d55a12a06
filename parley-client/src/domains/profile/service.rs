use log::{debug, info, warn};
use parley_model::routes::user;
use parley_model::{ProfilePictureResponse, UpdateProfileRequest, UserProfile};
use reqwest::multipart::{Form, Part};

use crate::domains::auth::AuthManager;
use crate::domains::auth::errors::{
    AuthError, AuthResult, GET_USER_FAILED, REMOVE_PICTURE_FAILED,
    UPDATE_PROFILE_FAILED, UPLOAD_PICTURE_FAILED,
};
use crate::domains::auth::session;
use crate::infra::errors::ApiError;

/// Multipart field the backend reads the image from.
pub const PICTURE_FIELD: &str = "image";
pub const DEFAULT_PICTURE_NAME: &str = "profile.jpg";
pub const DEFAULT_PICTURE_MIME: &str = "image/jpeg";

/// Image payload for [`ProfileService::upload_picture`].
#[derive(Clone)]
pub struct ProfilePicture {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl std::fmt::Debug for ProfilePicture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilePicture")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .finish()
    }
}

impl ProfilePicture {
    /// JPEG named `profile.jpg`.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: DEFAULT_PICTURE_NAME.to_string(),
            mime: DEFAULT_PICTURE_MIME.to_string(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|source| ApiError::InvalidMime {
                mime: self.mime.clone(),
                source,
            })?;
        Ok(Form::new().part(PICTURE_FIELD, part))
    }
}

/// Profile calls made on behalf of the stored session.
///
/// Each call sends the stored token explicitly and keeps the cached profile
/// snapshot in step with what the server returned.
#[derive(Debug, Clone)]
pub struct ProfileService {
    auth: AuthManager,
}

impl ProfileService {
    pub fn new(auth: AuthManager) -> Self {
        Self { auth }
    }

    /// GET the profile and refresh the cached snapshot.
    pub async fn fetch(&self) -> AuthResult<UserProfile> {
        let context = self.auth.auth_context().await?;
        let profile: UserProfile = self
            .auth
            .api()
            .get(user::CURRENT, &context)
            .await
            .map_err(|err| AuthError::request(err, GET_USER_FAILED))?;

        self.cache(&profile).await;
        Ok(profile)
    }

    /// PUT every editable field and cache the server's answer.
    pub async fn update(
        &self,
        request: &UpdateProfileRequest,
    ) -> AuthResult<UserProfile> {
        let context = self.auth.auth_context().await?;
        let mut profile: UserProfile = self
            .auth
            .api()
            .put(user::CURRENT, request, &context)
            .await
            .map_err(|err| {
                warn!("[Profile] Update failed: {}", err);
                AuthError::request(err, UPDATE_PROFILE_FAILED)
            })?;

        if profile.profile_picture_url.is_none()
            && let Some(cached) = self.cached().await
        {
            profile.profile_picture_url = cached.profile_picture_url;
        }

        info!("[Profile] Profile updated");
        self.cache(&profile).await;
        Ok(profile)
    }

    /// Upload a new picture and return its URL.
    pub async fn upload_picture(
        &self,
        picture: ProfilePicture,
    ) -> AuthResult<String> {
        let context = self.auth.auth_context().await?;
        debug!("[Profile] Uploading {:?}", picture);
        let form = picture
            .into_form()
            .map_err(|err| AuthError::request(err, UPLOAD_PICTURE_FAILED))?;

        let response: ProfilePictureResponse = self
            .auth
            .api()
            .post_multipart(user::PROFILE_PICTURE, form, &context)
            .await
            .map_err(|err| {
                warn!("[Profile] Picture upload failed: {}", err);
                AuthError::request(err, UPLOAD_PICTURE_FAILED)
            })?;

        let url = response.profile_picture_url;
        self.patch_cached(|profile| {
            profile.profile_picture_url = Some(url.clone())
        })
        .await;
        Ok(url)
    }

    /// Delete the current picture.
    pub async fn remove_picture(&self) -> AuthResult<()> {
        let context = self.auth.auth_context().await?;
        self.auth
            .api()
            .delete(user::PROFILE_PICTURE, &context)
            .await
            .map_err(|err| AuthError::request(err, REMOVE_PICTURE_FAILED))?;

        self.patch_cached(|profile| profile.profile_picture_url = None)
            .await;
        Ok(())
    }

    async fn cached(&self) -> Option<UserProfile> {
        match session::load_user(self.auth.store().as_ref()).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("[Profile] Ignoring unreadable profile snapshot: {}", err);
                None
            }
        }
    }

    /// Snapshot writes are best-effort: the server call already succeeded.
    async fn cache(&self, profile: &UserProfile) {
        if let Err(err) =
            session::store_user(self.auth.store().as_ref(), profile).await
        {
            warn!("[Profile] Failed to cache profile snapshot: {}", err);
        }
    }

    /// Edit the existing snapshot; nothing is written when there is none.
    async fn patch_cached(&self, patch: impl FnOnce(&mut UserProfile)) {
        let Some(mut profile) = self.cached().await else {
            return;
        };
        patch(&mut profile);
        self.cache(&profile).await;
    }
}
