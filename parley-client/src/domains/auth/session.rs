use parley_model::{BearerToken, UserProfile};

use super::errors::AuthResult;
use super::storage::{ACCESS_TOKEN_KEY, SessionStore, USER_KEY};

/// Token and profile snapshot as persisted in a [`SessionStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<BearerToken>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(access_token: BearerToken, user: Option<UserProfile>) -> Self {
        Self {
            access_token: Some(access_token),
            user,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Read both entries. Empty strings count as absent.
    pub async fn load(store: &dyn SessionStore) -> AuthResult<Self> {
        let access_token = load_token(store).await?;
        let user = load_user(store).await?;
        Ok(Self { access_token, user })
    }

    /// Write both entries. A missing user removes any earlier snapshot so
    /// the token is never paired with another account's profile.
    pub async fn persist(&self, store: &dyn SessionStore) -> AuthResult<()> {
        if let Some(token) = &self.access_token {
            store.set(ACCESS_TOKEN_KEY, token.as_str()).await?;
        }
        match &self.user {
            Some(user) => store_user(store, user).await?,
            None => store.remove(USER_KEY).await?,
        }
        Ok(())
    }

    /// Remove both entries, attempting each even if the other fails.
    pub async fn clear(store: &dyn SessionStore) -> AuthResult<()> {
        let token = store.remove(ACCESS_TOKEN_KEY).await;
        let user = store.remove(USER_KEY).await;
        token?;
        user?;
        Ok(())
    }
}

pub(crate) async fn load_token(
    store: &dyn SessionStore,
) -> AuthResult<Option<BearerToken>> {
    Ok(store
        .get(ACCESS_TOKEN_KEY)
        .await?
        .filter(|token| !token.is_empty())
        .map(BearerToken::new))
}

pub(crate) async fn load_user(
    store: &dyn SessionStore,
) -> AuthResult<Option<UserProfile>> {
    match store.get(USER_KEY).await? {
        Some(json) if !json.trim().is_empty() => {
            Ok(Some(serde_json::from_str(&json)?))
        }
        _ => Ok(None),
    }
}

pub(crate) async fn store_user(
    store: &dyn SessionStore,
    user: &UserProfile,
) -> AuthResult<()> {
    let json = serde_json::to_string(user)?;
    store.set(USER_KEY, &json).await?;
    Ok(())
}
