use reqwest::StatusCode;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use pbl_tracker::http::DEFAULT_MAX_BODY_BYTES;
use pbl_tracker::{build_router, AppState, IdentityProvider, SqliteStore, StaticTokenIdentity};

use super::FaultInjectingStore;

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";

/// The full application on an ephemeral port, backed by in-memory SQLite
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub store: Arc<FaultInjectingStore>,
    pub state: AppState,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(test_identity(), DEFAULT_MAX_BODY_BYTES).await
    }

    pub async fn start_with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::start_with(identity, DEFAULT_MAX_BODY_BYTES).await
    }

    pub async fn start_with_body_limit(max_body_bytes: usize) -> Self {
        Self::start_with(test_identity(), max_body_bytes).await
    }

    async fn start_with(identity: Arc<dyn IdentityProvider>, max_body_bytes: usize) -> Self {
        let sqlite = SqliteStore::in_memory().await.expect("in-memory store");
        let store = Arc::new(FaultInjectingStore::new(sqlite));

        let state = AppState::new(store.clone(), identity).with_max_body_bytes(max_body_bytes);
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        Self {
            addr,
            client: reqwest::Client::new(),
            store,
            state,
        }
    }

    pub fn sqlite(&self) -> &SqliteStore {
        self.store.inner()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await.expect("send GET")).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.post_raw(path, token, body.to_string()).await
    }

    pub async fn post_raw(
        &self,
        path: &str,
        token: Option<&str>,
        body: impl Into<reqwest::Body>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await.expect("send POST")).await
    }

    /// Row counts of (projects, project_members, learning_stages)
    pub async fn row_counts(&self) -> (i64, i64, i64) {
        let pool = self.sqlite().pool();
        let count = |table: &'static str| async move {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(pool)
                .await
                .expect("count rows")
        };
        (
            count("projects").await,
            count("project_members").await,
            count("learning_stages").await,
        )
    }
}

fn test_identity() -> Arc<dyn IdentityProvider> {
    Arc::new(
        StaticTokenIdentity::new()
            .with_token(ALICE_TOKEN, "alice")
            .with_token(BOB_TOKEN, "bob"),
    )
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json::<Value>().await.expect("JSON response body");
    (status, body)
}
