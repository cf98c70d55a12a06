use log::{debug, info, warn};
use parley_model::routes::{auth, user};
use parley_model::{
    AuthResponse, BearerToken, LoginRequest, RegisterRequest, UserProfile,
};
use std::sync::Arc;

use crate::domains::auth::errors::{
    AuthError, AuthResult, GET_USER_FAILED, INVALID_CREDENTIALS, LOGOUT_FAILED,
    REGISTRATION_FAILED,
};
use crate::domains::auth::session::{self, Session};
use crate::domains::auth::storage::{
    ACCESS_TOKEN_KEY, FileSessionStore, SessionStore, USER_KEY,
};
use crate::infra::{ApiClient, ApiError, AuthContext, ClientConfig};

/// How a logout ended. Local state is cleared in every case.
#[derive(Debug)]
pub enum LogoutOutcome {
    /// The server acknowledged the revocation
    Revoked,
    /// There was no stored token, so nothing was sent
    NoSession,
    /// The server call failed; the token may still be valid server-side
    /// and can be retried with [`AuthManager::revoke_token`]
    LocalOnly { token: BearerToken, reason: AuthError },
}

impl LogoutOutcome {
    pub fn is_revoked(&self) -> bool {
        matches!(self, LogoutOutcome::Revoked)
    }
}

/// Session lifecycle over an [`ApiClient`] and a [`SessionStore`].
///
/// The manager keeps no session state of its own: the store is the source
/// of truth and the client's default `Authorization` header mirrors it.
#[derive(Debug, Clone)]
pub struct AuthManager {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
}

impl AuthManager {
    pub fn new(api: ApiClient, store: Arc<dyn SessionStore>) -> Self {
        Self { api, store }
    }

    /// Client and file-backed store built from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(config)?;
        let store = Arc::new(FileSessionStore::new(&config.session_path));
        Ok(Self::new(api, store))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Create an account. The request goes out unvalidated; the backend's
    /// field errors come back in [`AuthError::field_errors`].
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> AuthResult<AuthResponse> {
        info!("[Auth] Registering user '{}'", request.username);
        let response: AuthResponse = self
            .api
            .post(auth::REGISTER, request, &AuthContext::Anonymous)
            .await
            .map_err(|err| {
                warn!("[Auth] Registration failed: {}", err);
                AuthError::request_verbose(err, REGISTRATION_FAILED)
            })?;

        self.establish(&response).await?;
        Ok(response)
    }

    /// Exchange credentials for a session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthResponse> {
        info!("[Auth] Logging in as {}", email);
        let request = LoginRequest::new(email, password);
        let response: AuthResponse = self
            .api
            .post(auth::LOGIN, &request, &AuthContext::Anonymous)
            .await
            .map_err(|err| {
                warn!("[Auth] Login failed: {}", err);
                AuthError::request(err, INVALID_CREDENTIALS)
            })?;

        self.establish(&response).await?;
        Ok(response)
    }

    /// Install and persist the session carried by a login or register
    /// response. A response without a token leaves the state as it was.
    async fn establish(&self, response: &AuthResponse) -> AuthResult<()> {
        let Some(token) = response.bearer_token() else {
            warn!("[Auth] Success response carried no access token");
            return Ok(());
        };

        self.api
            .set_authorization(Some(&token))
            .await
            .map_err(AuthError::InvalidToken)?;

        let session = Session::new(token, response.user.clone());
        if let Err(err) = session.persist(self.store.as_ref()).await {
            warn!("[Auth] Failed to persist session: {}", err);
            self.clear_local().await;
            return Err(err);
        }

        info!("[Auth] Session established");
        Ok(())
    }

    /// End the session. Local state is always cleared; a failed server call
    /// only downgrades the outcome to [`LogoutOutcome::LocalOnly`].
    pub async fn logout(&self) -> AuthResult<LogoutOutcome> {
        let token = match session::load_token(self.store.as_ref()).await {
            Ok(token) => token,
            Err(err) => {
                warn!("[Auth] Could not read stored token for logout: {}", err);
                None
            }
        };

        let outcome = match token {
            None => {
                debug!("[Auth] No stored token; skipping server logout");
                LogoutOutcome::NoSession
            }
            Some(token) => match self.revoke_token(&token).await {
                Ok(()) => LogoutOutcome::Revoked,
                Err(reason) => {
                    warn!(
                        "[Auth] Server logout failed, clearing local session anyway: {}",
                        reason
                    );
                    LogoutOutcome::LocalOnly { token, reason }
                }
            },
        };

        self.clear_local().await;
        info!("[Auth] Logged out");
        Ok(outcome)
    }

    /// Ask the server to revoke `token`. Local state is not touched.
    pub async fn revoke_token(&self, token: &BearerToken) -> AuthResult<()> {
        self.api
            .post_no_content(auth::LOGOUT, &AuthContext::bearer(token))
            .await
            .map_err(|err| AuthError::request(err, LOGOUT_FAILED))
    }

    /// Remove token, snapshot and default header. Failures are logged, not
    /// returned.
    async fn clear_local(&self) {
        for key in [ACCESS_TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.store.remove(key).await {
                warn!("[Auth] Failed to remove '{}' from store: {}", key, err);
            }
        }
        if let Err(err) = self.api.set_authorization(None).await {
            warn!("[Auth] Failed to clear authorization header: {}", err);
        }
    }

    /// Fetch the signed-in user. Without a stored token this fails with
    /// [`AuthError::NoSession`] and sends nothing.
    pub async fn current_user(&self) -> AuthResult<UserProfile> {
        let token = self.stored_token().await?;
        self.api
            .set_authorization(Some(&token))
            .await
            .map_err(AuthError::InvalidToken)?;

        self.api
            .get(user::CURRENT, &AuthContext::bearer(&token))
            .await
            .map_err(|err| {
                warn!("[Auth] Failed to get user: {}", err);
                AuthError::request(err, GET_USER_FAILED)
            })
    }

    /// Whether a token is stored. Never touches the network; an unreadable
    /// store counts as signed out.
    pub async fn is_authenticated(&self) -> bool {
        match session::load_token(self.store.as_ref()).await {
            Ok(token) => token.is_some(),
            Err(err) => {
                warn!("[Auth] Could not read session store: {}", err);
                false
            }
        }
    }

    /// Load the persisted session at startup and mirror its token into the
    /// default header. `None` when there is no stored token.
    pub async fn restore(&self) -> AuthResult<Option<Session>> {
        let session = Session::load(self.store.as_ref()).await?;
        let Some(token) = &session.access_token else {
            debug!("[Auth] No stored session to restore");
            return Ok(None);
        };

        self.api
            .set_authorization(Some(token))
            .await
            .map_err(AuthError::InvalidToken)?;
        info!("[Auth] Restored stored session");
        Ok(Some(session))
    }

    /// Last-known profile snapshot, without a network call.
    pub async fn cached_user(&self) -> AuthResult<Option<UserProfile>> {
        session::load_user(self.store.as_ref()).await
    }

    /// Explicit credentials for a request on behalf of the stored session.
    pub async fn auth_context(&self) -> AuthResult<AuthContext> {
        Ok(AuthContext::Bearer(self.stored_token().await?))
    }

    async fn stored_token(&self) -> AuthResult<BearerToken> {
        session::load_token(self.store.as_ref())
            .await?
            .ok_or(AuthError::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::errors::StorageError;
    use crate::domains::auth::storage::MemorySessionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn manager_for(server: &MockServer) -> (AuthManager, Arc<MemorySessionStore>) {
        let config = ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            session_path: std::env::temp_dir().join("parley-unused.json"),
        };
        let store = Arc::new(MemorySessionStore::new());
        let manager = AuthManager::new(ApiClient::new(&config).unwrap(), store.clone());
        (manager, store)
    }

    /// Accepts reads, refuses every write.
    #[derive(Debug, Default)]
    struct ReadOnlyStore {
        inner: MemorySessionStore,
    }

    #[async_trait]
    impl SessionStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                path: "session.json".into(),
                source: std::io::Error::other("read-only"),
            })
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                path: "session.json".into(),
                source: std::io::Error::other("read-only"),
            })
        }
    }

    #[tokio::test]
    async fn register_sends_fields_without_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({
                "username": "ana",
                "email": "a@b.com",
                "first_name": "Ana",
                "last_name": "Lee",
                "phone_number": "",
                "password": "secret12",
                "password_confirmation": "secret12",
            })))
            .and(|request: &Request| !request.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "access_token": "tok9",
                "user": { "username": "ana" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (manager, store) = manager_for(&server);
        manager
            .api()
            .set_authorization(Some(&BearerToken::new("stale")))
            .await
            .unwrap();

        let request = RegisterRequest {
            username: "ana".into(),
            email: "a@b.com".into(),
            first_name: "Ana".into(),
            last_name: "Lee".into(),
            password: "secret12".into(),
            password_confirmation: "secret12".into(),
            ..Default::default()
        };
        let response = manager.register(&request).await.unwrap();

        assert_eq!(response.access_token.as_deref(), Some("tok9"));
        assert_eq!(
            store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
            Some("tok9")
        );
        assert_eq!(
            manager.api().authorization_header().await.as_deref(),
            Some("Bearer tok9")
        );
    }

    #[tokio::test]
    async fn login_failure_uses_backend_message_or_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (manager, store) = manager_for(&server);
        let err = manager.login("a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err.message(), INVALID_CREDENTIALS);
        assert_eq!(
            err.api_error().and_then(ApiError::status),
            Some(reqwest::StatusCode::UNAUTHORIZED)
        );
        assert!(!manager.is_authenticated().await);
        assert_eq!(store.get(USER_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn success_without_token_does_not_create_a_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "Check your inbox" })),
            )
            .mount(&server)
            .await;

        let (manager, _store) = manager_for(&server);
        let response = manager.login("a@b.com", "secret12").await.unwrap();

        assert_eq!(response.access_token, None);
        assert_eq!(response.extra["message"], "Check your inbox");
        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.api().authorization_header().await, None);
    }

    #[tokio::test]
    async fn unexpected_success_shape_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": 42 })),
            )
            .mount(&server)
            .await;

        let (manager, _store) = manager_for(&server);
        let err = manager.login("a@b.com", "secret12").await.unwrap_err();

        assert!(matches!(err.api_error(), Some(ApiError::Schema { .. })));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_the_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok1",
                "user": {},
            })))
            .mount(&server)
            .await;

        let config = ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            session_path: std::env::temp_dir().join("parley-unused.json"),
        };
        let manager = AuthManager::new(
            ApiClient::new(&config).unwrap(),
            Arc::new(ReadOnlyStore::default()),
        );

        let err = manager.login("a@b.com", "secret12").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(manager.api().authorization_header().await, None);
    }

    #[tokio::test]
    async fn logout_without_token_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (manager, _store) = manager_for(&server);
        let outcome = manager.logout().await.unwrap();
        assert!(matches!(outcome, LogoutOutcome::NoSession));
    }

    #[tokio::test]
    async fn logout_clears_header_even_when_store_refuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            session_path: std::env::temp_dir().join("parley-unused.json"),
        };
        let store = ReadOnlyStore::default();
        store.inner.set(ACCESS_TOKEN_KEY, "tok1").await.unwrap();
        let manager =
            AuthManager::new(ApiClient::new(&config).unwrap(), Arc::new(store));
        manager.restore().await.unwrap();

        let outcome = manager.logout().await.unwrap();
        assert!(outcome.is_revoked());
        assert_eq!(manager.api().authorization_header().await, None);
    }

    #[tokio::test]
    async fn failed_logout_hands_back_the_token_for_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (manager, store) = manager_for(&server);
        store.set(ACCESS_TOKEN_KEY, "tok1").await.unwrap();

        let (token, reason) = match manager.logout().await.unwrap() {
            LogoutOutcome::LocalOnly { token, reason } => (token, reason),
            other => panic!("expected LocalOnly, got {other:?}"),
        };
        assert_eq!(reason.message(), LOGOUT_FAILED);
        assert!(!manager.is_authenticated().await);

        manager.revoke_token(&token).await.unwrap();
    }

    #[tokio::test]
    async fn current_user_sends_stored_token_and_mirrors_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "ana",
                "bio": null,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (manager, store) = manager_for(&server);
        store.set(ACCESS_TOKEN_KEY, "tok1").await.unwrap();

        let user = manager.current_user().await.unwrap();
        assert_eq!(user.username.as_deref(), Some("ana"));
        assert_eq!(user.bio, None);
        assert_eq!(
            manager.api().authorization_header().await.as_deref(),
            Some("Bearer tok1")
        );
    }

    #[tokio::test]
    async fn current_user_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let (manager, store) = manager_for(&server);
        store.set(ACCESS_TOKEN_KEY, "tok1").await.unwrap();

        let err = manager.current_user().await.unwrap_err();
        assert_eq!(err.message(), GET_USER_FAILED);
    }

    #[tokio::test]
    async fn restore_and_cached_user() {
        let server = MockServer::start().await;
        let (manager, store) = manager_for(&server);

        assert!(manager.restore().await.unwrap().is_none());
        assert!(matches!(
            manager.auth_context().await,
            Err(AuthError::NoSession)
        ));

        store.set(ACCESS_TOKEN_KEY, "tok1").await.unwrap();
        store
            .set(USER_KEY, r#"{"username":"ana","theme":"dark"}"#)
            .await
            .unwrap();

        let session = manager.restore().await.unwrap().unwrap();
        assert_eq!(session.access_token, Some(BearerToken::new("tok1")));
        assert_eq!(
            manager.api().authorization_header().await.as_deref(),
            Some("Bearer tok1")
        );

        let cached = manager.cached_user().await.unwrap().unwrap();
        assert_eq!(cached.username.as_deref(), Some("ana"));
        assert_eq!(cached.extra["theme"], "dark");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
