//! Shared harness: a wiremock backend plus a manager persisting to a
//! temporary session file.

use parley_client::{AuthManager, ClientConfig};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

pub struct Harness {
    pub server: MockServer,
    pub manager: AuthManager,
    pub config: ClientConfig,
    _dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().expect("temp dir");
        let config = ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            session_path: dir.path().join("session.json"),
        };
        let manager =
            AuthManager::from_config(&config).expect("client should build");
        Self {
            server,
            manager,
            config,
            _dir: dir,
        }
    }

    /// A second manager over the same session file, as after a restart.
    pub fn reopen(&self) -> AuthManager {
        AuthManager::from_config(&self.config).expect("client should build")
    }
}
