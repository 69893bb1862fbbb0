//! Common test setup functions.

use api::{router, AppState, AuthConfig, Credentials};
use axum::{http::StatusCode, Router};
use axum_test::{TestResponse, TestServer};
use clickhouse_client::{init_schema, ClickHouseClient, ClickHouseStore};
use memory_store::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use watch_core::{AccountStore, ServiceConfig, WatchServices, WatchStore};

use crate::containers::ClickHouseServer;
use crate::fixtures;

/// Signing secret shared by every test context.
pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

fn build_state(watch: Arc<dyn WatchStore>, accounts: Arc<dyn AccountStore>) -> AppState {
    let credentials = Credentials::new(
        accounts,
        AuthConfig {
            secret: TEST_SECRET.to_string(),
            ..Default::default()
        },
    )
    .expect("Failed to create credentials");
    AppState::new(
        WatchServices::new(watch, ServiceConfig::default()),
        Arc::new(credentials),
    )
}

/// Test context over the in-memory store.
///
/// Uses the real Axum router with all layers; the store's failure
/// switches stand in for backend outages.
pub struct TestContext {
    pub store: MemoryStore,
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let state = build_state(Arc::new(store.clone()), Arc::new(store.clone()));
        let router = router(state.clone(), &["*".to_string()]);
        Self {
            store,
            state,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context over a real ClickHouse testcontainer.
pub struct ClickHouseContext {
    pub clickhouse: ClickHouseServer,
    pub store: ClickHouseStore,
    pub state: AppState,
    pub router: Router,
}

impl ClickHouseContext {
    pub async fn new() -> Self {
        let clickhouse = ClickHouseServer::acquire().await;
        let client = ClickHouseClient::new(clickhouse.config.clone())
            .expect("Failed to create ClickHouse client");

        init_schema(&client)
            .await
            .expect("Failed to initialize schema");

        let store = ClickHouseStore::new(client);
        let state = build_state(Arc::new(store.clone()), Arc::new(store.clone()));
        let router = router(state.clone(), &["*".to_string()]);

        Self {
            clickhouse,
            store,
            state,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Signs up a fresh user and returns their access token.
pub async fn signup(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/auth/signup")
        .json(&fixtures::signup_body(username))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["access_token"]
        .as_str()
        .expect("signup returns a token")
        .to_string()
}

/// Posts a watch event with the default referer.
pub async fn post_event(
    server: &TestServer,
    token: &str,
    session: Option<&str>,
    body: &Value,
) -> TestResponse {
    let mut request = server
        .post("/api/video-events")
        .add_header("Authorization", bearer(token))
        .add_header("Referer", fixtures::REFERER);
    if let Some(session) = session {
        request = request.add_header("x-session-id", session.to_string());
    }
    request.json(body).await
}

/// Posts a watch event and returns the created record.
pub async fn create_event(
    server: &TestServer,
    token: &str,
    session: Option<&str>,
    body: &Value,
) -> Value {
    let response = post_event(server, token, session, body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// Creates a watch session and returns the created record.
pub async fn create_session(server: &TestServer, token: &str, body: &Value) -> Value {
    let response = server
        .post("/api/watch-sessions")
        .add_header("Authorization", bearer(token))
        .add_header("Referer", fixtures::REFERER)
        .json(body)
        .await;
    response.assert_status_ok();
    response.json()
}
