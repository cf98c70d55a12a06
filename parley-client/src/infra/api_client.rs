use log::{debug, warn};
use parley_model::{ApiErrorBody, BearerToken};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue,
};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::infra::config::ClientConfig;
use crate::infra::errors::ApiError;

/// Credentials to attach to a single request.
///
/// Requests always name their credentials instead of relying on whatever
/// the shared default headers currently hold.
#[derive(Debug, Clone, Default)]
pub enum AuthContext {
    /// Use the client's default headers as they are
    #[default]
    Default,
    /// Send this token, whatever the defaults say
    Bearer(BearerToken),
    /// Send no `Authorization` header at all
    Anonymous,
}

impl AuthContext {
    pub fn bearer(token: &BearerToken) -> Self {
        AuthContext::Bearer(token.clone())
    }
}

/// HTTP client bound to a single backend origin.
///
/// Cloning is cheap; clones share the connection pool and the default header
/// map.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    default_headers: Arc<RwLock<HeaderMap>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field(
                "has_authorization",
                &self
                    .default_headers
                    .try_read()
                    .map(|headers| headers.contains_key(AUTHORIZATION))
                    .unwrap_or(false),
            )
            .finish()
    }
}

/// Add `http://` when no scheme was given and trim trailing slashes, so
/// `localhost:8000/api/` and `http://localhost:8000/api` behave the same.
pub(crate) fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme =
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
    if with_scheme != raw {
        warn!(
            "[ApiClient] Normalized base URL from '{}' to '{}'",
            raw, with_scheme
        );
    }
    with_scheme
}

fn bearer_header(token: &BearerToken) -> Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&token.header_value())?;
    value.set_sensitive(true);
    Ok(value)
}

impl ApiClient {
    /// Create a client for `config.base_url` with JSON content negotiation
    /// as the default.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url);
        url::Url::parse(&base_url).map_err(|source| {
            ApiError::InvalidBaseUrl {
                url: base_url.clone(),
                source,
            }
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        debug!("[ApiClient] Creating API client with base URL: {}", base_url);

        Ok(Self {
            client,
            base_url,
            default_headers: Arc::new(RwLock::new(headers)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a route onto the base URL. Absolute URLs pass through untouched.
    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let p = path.as_ref();
        if p.starts_with("http://") || p.starts_with("https://") {
            return p.to_string();
        }
        format!("{}/{}", self.base_url, p.trim_start_matches('/'))
    }

    /// Install (`Some`) or remove (`None`) the default
    /// `Authorization: Bearer` header used by [`AuthContext::Default`].
    pub async fn set_authorization(
        &self,
        token: Option<&BearerToken>,
    ) -> Result<(), ApiError> {
        let mut headers = self.default_headers.write().await;
        match token {
            Some(token) => {
                headers.insert(AUTHORIZATION, bearer_header(token)?);
                debug!("[ApiClient] Installed default bearer header");
            }
            None => {
                if headers.remove(AUTHORIZATION).is_some() {
                    debug!("[ApiClient] Cleared default bearer header");
                }
            }
        }
        Ok(())
    }

    /// Current default `Authorization` header value, if any.
    pub async fn authorization_header(&self) -> Option<String> {
        self.default_headers
            .read()
            .await
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    /// Snapshot of the default header map.
    pub async fn default_headers(&self) -> HeaderMap {
        self.default_headers.read().await.clone()
    }

    /// Default headers adjusted for `auth`.
    async fn request_headers(
        &self,
        auth: &AuthContext,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = self.default_headers.read().await.clone();
        match auth {
            AuthContext::Default => {}
            AuthContext::Bearer(token) => {
                headers.insert(AUTHORIZATION, bearer_header(token)?);
            }
            AuthContext::Anonymous => {
                headers.remove(AUTHORIZATION);
            }
        }
        Ok(headers)
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
    ) -> RequestBuilder {
        let url = self.build_url(path);
        debug!("[ApiClient] {} {}", method, url);
        self.client.request(method, url).headers(headers)
    }

    /// Send the request and turn non-2xx answers into
    /// [`ApiError::HttpStatus`], keeping the backend's message and field
    /// errors.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let parsed = ApiErrorBody::parse(&body);
        let message = parsed
            .as_ref()
            .and_then(|error| error.message())
            .map(str::to_owned);
        let field_errors = parsed
            .map(|error| error.field_errors())
            .unwrap_or_default();

        debug!(
            "[ApiClient] Request failed with status {} ({} field errors)",
            status,
            field_errors.len()
        );
        Err(ApiError::HttpStatus {
            status,
            message,
            field_errors,
            body,
        })
    }

    /// Decode a 2xx body against the endpoint schema. An empty body decodes
    /// as JSON `null`.
    async fn decode<R: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<R, ApiError> {
        let bytes = response.bytes().await?;
        let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(payload).map_err(|source| ApiError::Schema {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// GET and decode the JSON body.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        auth: &AuthContext,
    ) -> Result<R, ApiError> {
        let headers = self.request_headers(auth).await?;
        let request = self.build_request(Method::GET, path, headers);
        let response = self.execute(request).await?;
        Self::decode(response, path).await
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
        auth: &AuthContext,
    ) -> Result<R, ApiError> {
        let headers = self.request_headers(auth).await?;
        let request = self.build_request(Method::POST, path, headers).json(body);
        let response = self.execute(request).await?;
        Self::decode(response, path).await
    }

    /// POST without a body, for endpoints whose answer carries nothing the
    /// client needs.
    pub async fn post_no_content(
        &self,
        path: &str,
        auth: &AuthContext,
    ) -> Result<(), ApiError> {
        let headers = self.request_headers(auth).await?;
        let request = self.build_request(Method::POST, path, headers);
        self.execute(request).await?;
        Ok(())
    }

    /// PUT a JSON body and decode the JSON answer.
    pub async fn put<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
        auth: &AuthContext,
    ) -> Result<R, ApiError> {
        let headers = self.request_headers(auth).await?;
        let request = self.build_request(Method::PUT, path, headers).json(body);
        let response = self.execute(request).await?;
        Self::decode(response, path).await
    }

    /// DELETE, ignoring whatever body comes back.
    pub async fn delete(
        &self,
        path: &str,
        auth: &AuthContext,
    ) -> Result<(), ApiError> {
        let headers = self.request_headers(auth).await?;
        let request = self.build_request(Method::DELETE, path, headers);
        self.execute(request).await?;
        Ok(())
    }

    /// POST `multipart/form-data` instead of JSON and decode the JSON answer.
    pub async fn post_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        auth: &AuthContext,
    ) -> Result<R, ApiError> {
        let mut headers = self.request_headers(auth).await?;
        // reqwest appends its own boundary content type; the JSON default
        // would otherwise be sent alongside it.
        headers.remove(CONTENT_TYPE);
        let request =
            self.build_request(Method::POST, path, headers).multipart(form);
        let response = self.execute(request).await?;
        Self::decode(response, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config_for(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            session_path: std::env::temp_dir().join("parley-unused.json"),
        }
    }

    fn has_no_authorization(request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }

    #[test]
    fn normalizes_scheme_and_trailing_slash() {
        assert_eq!(
            normalize_base_url("localhost:8000/api/"),
            "http://localhost:8000/api"
        );
        assert_eq!(
            normalize_base_url("https://chat.example.com/api"),
            "https://chat.example.com/api"
        );
    }

    #[test]
    fn build_url_joins_routes_and_passes_absolute_urls() {
        let client =
            ApiClient::new(&config_for("http://localhost:8000/api")).unwrap();

        assert_eq!(client.build_url("/user"), "http://localhost:8000/api/user");
        assert_eq!(client.build_url("login"), "http://localhost:8000/api/login");
        assert_eq!(
            client.build_url("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = ApiClient::new(&config_for("http://bad host/api")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn defaults_negotiate_json() {
        let client =
            ApiClient::new(&config_for("http://localhost:8000/api")).unwrap();
        let headers = client.default_headers().await;

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn set_authorization_installs_and_clears_header() {
        let client =
            ApiClient::new(&config_for("http://localhost:8000/api")).unwrap();
        let token = BearerToken::new("tok1");

        client.set_authorization(Some(&token)).await.unwrap();
        assert_eq!(
            client.authorization_header().await.as_deref(),
            Some("Bearer tok1")
        );

        client.set_authorization(None).await.unwrap();
        assert_eq!(client.authorization_header().await, None);
        assert!(!client.default_headers().await.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn auth_context_controls_the_sent_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/default"))
            .and(header("authorization", "Bearer ambient"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/explicit"))
            .and(header("authorization", "Bearer explicit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anonymous"))
            .and(has_no_authorization)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        client
            .set_authorization(Some(&BearerToken::new("ambient")))
            .await
            .unwrap();

        let _: Value = client.get("/default", &AuthContext::Default).await.unwrap();
        let explicit = AuthContext::bearer(&BearerToken::new("explicit"));
        let _: Value = client.get("/explicit", &explicit).await.unwrap();
        let _: Value =
            client.get("/anonymous", &AuthContext::Anonymous).await.unwrap();

        // The explicit token never leaks into the defaults.
        assert_eq!(
            client.authorization_header().await.as_deref(),
            Some("Bearer ambient")
        );
    }

    #[tokio::test]
    async fn error_body_message_and_field_errors_are_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "The given data was invalid.",
                "errors": {
                    "password": ["The password confirmation does not match."]
                }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        let err = client
            .post::<_, Value>("/register", &json!({}), &AuthContext::Anonymous)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(err.backend_message(), Some("The given data was invalid."));
        assert_eq!(
            err.field_errors(),
            ["The password confirmation does not match."]
        );
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn non_json_error_body_has_no_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        let err = client
            .get::<Value>("/user", &AuthContext::Default)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::BAD_GATEWAY));
        assert_eq!(err.backend_message(), None);
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn mismatched_success_body_is_a_schema_error() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Expected {
            profile_picture_url: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": 1 })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        let err = client
            .get::<Expected>("/thing", &AuthContext::Default)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Schema { ref endpoint, .. } if endpoint == "/thing"));
    }

    #[tokio::test]
    async fn empty_success_body_is_accepted_for_no_content_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/user/profile-picture"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        client
            .post_no_content("/logout", &AuthContext::Default)
            .await
            .unwrap();
        client
            .delete("/user/profile-picture", &AuthContext::Default)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn multipart_replaces_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_exists("content-type"))
            .and(|request: &Request| {
                let values: Vec<_> =
                    request.headers.get_all("content-type").iter().collect();
                values.len() == 1
                    && values[0]
                        .to_str()
                        .is_ok_and(|v| v.starts_with("multipart/form-data"))
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profile_picture_url": "https://cdn.example.com/p.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(&server.uri())).unwrap();
        let form = Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(vec![1, 2, 3])
                .file_name("profile.jpg"),
        );
        let body: Value = client
            .post_multipart("/upload", form, &AuthContext::Default)
            .await
            .unwrap();
        assert_eq!(body["profile_picture_url"], "https://cdn.example.com/p.jpg");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client =
            ApiClient::new(&config_for(&format!("http://127.0.0.1:{port}")))
                .unwrap();

        let err = client
            .get::<Value>("/user", &AuthContext::Anonymous)
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
