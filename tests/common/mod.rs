//! Common test utilities for E2E tests

use tempfile::TempDir;
use tokengate::{AppState, config};
use tokio::net::TcpListener;

pub const SHARED_SECRET: &str = "bootstrap-shared-secret";
pub const SHARED_SECRET_DESCRIPTION: &str = "Bootstrap admin token";
pub const TEST_HASH_ROUNDS: u32 = 1_000;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        Self::with_config(test_config(&temp_dir), temp_dir).await
    }

    /// Start a server over an already-prepared config and data directory
    pub async fn with_config(config: config::AppConfig, temp_dir: TempDir) -> Self {
        let state = AppState::new(config).await.unwrap();

        // Redirects and cookies are inspected by hand.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tokengate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST /login with `secret`
    pub async fn login(&self, secret: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .form(&[("token", secret)])
            .send()
            .await
            .expect("login request succeeds")
    }

    /// Log in with the bootstrap secret and return the session token
    pub async fn login_token(&self) -> String {
        let response = self.login(SHARED_SECRET).await;
        assert_eq!(response.status(), 200);
        session_cookie_value(&response).expect("login sets the token cookie")
    }

    /// GET `path` presenting `token` as the session cookie
    pub async fn get_with_cookie(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Cookie", format!("token={token}"))
            .send()
            .await
            .expect("request succeeds")
    }
}

/// Configuration pointing at a database inside `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            secure_cookies: false,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        auth: config::AuthConfig {
            signing_secret: "test-signing-secret-32-bytes-long!!".to_string(),
            shared_secret: SHARED_SECRET.to_string(),
            shared_secret_description: SHARED_SECRET_DESCRIPTION.to_string(),
            hash_rounds: TEST_HASH_ROUNDS,
            session_max_age: None,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Value of the `token` cookie set by `response`, if any
pub fn session_cookie_value(response: &reqwest::Response) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find_map(|header| {
            header
                .strip_prefix("token=")
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
}

/// All `Set-Cookie` header values on `response`
pub fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}
