use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::audit::AuditLog;
use crate::auth::LoginGuard;
use crate::clock::Clock;
use crate::config::{Config, SecurityConfig};

/// A test application builder for integration testing.
///
/// Spins up a TUPark server with an in-memory SQLite database. Requests
/// reach it over loopback, so every client shares the `127.0.0.1` login key.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login() {
///     let app = TestApp::new().await;
///     app.create_admin("admin", "secret123").await;
///     let res = app.post("/login", r#"{"adminId":"admin","password":"secret123"}"#).await;
///     assert_eq!(res.status, 200);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
    pub audit: AuditLog,
    pub guard: Arc<LoginGuard>,
}

impl TestApp {
    /// Test app with the request throttle **disabled** and default lockout.
    pub async fn new() -> Self {
        let mut config = Self::base_config();
        config.security.enable_rate_limit = false;
        Self::with_config(config).await
    }

    /// Test app with every security default, including the request throttle.
    pub async fn new_secure() -> Self {
        Self::with_config(Self::base_config()).await
    }

    /// In-memory configuration used by the constructors.
    pub fn base_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-for-testing".to_string(),
            session_ttl_minutes: 15,
            server_host: "127.0.0.1".to_string(),
            server_port: 0, // OS assigns a random port
            environment: "test".to_string(),
            parking_slots: vec!["A1".to_string(), "A2".to_string(), "B1".to_string()],
            security: SecurityConfig::default(),
        }
    }

    /// Create a new test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        Self::build(config, None).await
    }

    /// Create a test app whose lockout decisions use `clock`.
    pub async fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, Some(clock)).await
    }

    async fn build(config: Config, clock: Option<Arc<dyn Clock>>) -> Self {
        let mut app = crate::App::with_config(config)
            .await
            .expect("Failed to create test app");
        if let Some(clock) = clock {
            app = app.with_clock(clock);
        }

        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            db: app.db,
            config: app.config,
            audit: app.audit,
            guard: app.guard,
        }
    }

    /// Get the base URL for the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert an administrator directly into the database.
    pub async fn create_admin(&self, username: &str, password: &str) {
        crate::auth::create_admin(&self.db, username, password)
            .await
            .expect("Failed to create administrator");
    }

    /// Log in and return the session token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "adminId": username,
            "password": password,
        });

        let res = self.post("/login", &body.to_string()).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.body);

        res.json()["data"]["access_token"]
            .as_str()
            .expect("Login response has no token")
            .to_string()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.client.get(&self.url(path)).await
    }

    pub async fn post(&self, path: &str, body: &str) -> TestResponse {
        self.client.post(&self.url(path), body).await
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        let res = self.inner.get(url).send().await.expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a GET request with an auth token.
    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("GET request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a POST request with auth token and JSON body.
    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        let res = self
            .inner
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .body(body.to_string())
            .send()
            .await
            .expect("POST request failed");
        TestResponse::from_response(res).await
    }

    /// Send a DELETE request with auth token.
    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        let res = self
            .inner
            .delete(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("DELETE request failed");
        TestResponse::from_response(res).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.json()["success"].as_bool().unwrap_or(false)
    }

    /// The user-facing `message` field.
    pub fn message(&self) -> String {
        self.json()["message"].as_str().unwrap_or_default().to_string()
    }

    /// Get the data field from the response.
    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    /// Get the error field from the response.
    pub fn error(&self) -> serde_json::Value {
        self.json()["error"].clone()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
