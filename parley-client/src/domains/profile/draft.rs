use parley_model::{UpdateProfileRequest, UserProfile};

/// Editable copy of a profile that knows whether it differs from what the
/// server last returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDraft {
    original: UpdateProfileRequest,
    original_photo: Option<String>,
    pub fields: UpdateProfileRequest,
    pub photo: Option<String>,
}

impl ProfileDraft {
    pub fn new(profile: &UserProfile) -> Self {
        let fields = UpdateProfileRequest::from(profile);
        Self {
            original: fields.clone(),
            original_photo: profile.profile_picture_url.clone(),
            fields,
            photo: profile.profile_picture_url.clone(),
        }
    }

    /// Any field or the photo changed since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.fields != self.original || self.photo != self.original_photo
    }

    pub fn to_request(&self) -> UpdateProfileRequest {
        self.fields.clone()
    }

    /// Adopt the server's answer to a save as the new baseline. The photo is
    /// managed by its own endpoints, so the local one is kept.
    pub fn commit(&mut self, saved: &UserProfile) {
        self.fields = UpdateProfileRequest::from(saved);
        self.original = self.fields.clone();
        self.original_photo = self.photo.clone();
    }

    /// Throw away local edits.
    pub fn reset(&mut self) {
        self.fields = self.original.clone();
        self.photo = self.original_photo.clone();
    }
}
