//! Test fixtures for webhook tests
//!
//! Provides TestEnvironment that sets up everything needed to drive the
//! router:
//! - Temporary SQLite database
//! - Recording outbox
//! - Webhook state with its task tracker

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use super::RecordingOutbox;
use opibot::core::web_server::{self, WebhookState};
use opibot::storage::WellStore;
use opibot::telegram::CommandDispatcher;

pub const TEST_CHAT_ID: i64 = 123456789;
pub const TEST_USER_ID: i64 = 987654321;

/// Telegram update JSON with one text message
pub fn create_message_json(update_id: i64, chat_id: i64, user_id: i64, text: &str) -> String {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_700_000_000,
            "chat": {"id": chat_id, "type": "private", "first_name": "Ivan"},
            "from": {"id": user_id, "is_bot": false, "first_name": "Ivan"},
            "text": text
        }
    })
    .to_string()
}

/// Complete test environment
///
/// # Example
/// ```ignore
/// let env = TestEnvironment::new();
/// let (status, body) = env.post_webhook(create_message_json(1, 1, 1, "/help")).await;
/// env.drain().await;
/// assert_eq!(env.outbox.texts().len(), 1);
/// ```
pub struct TestEnvironment {
    _dir: TempDir,
    /// SQLite file behind `store`
    pub db_path: PathBuf,
    pub store: Arc<WellStore>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub outbox: Arc<RecordingOutbox>,
    pub state: WebhookState,
    next_update_id: std::sync::atomic::AtomicI64,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_session_timeout(None)
    }

    pub fn with_session_timeout(timeout: Option<Duration>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("wells.db");
        let store = Arc::new(WellStore::open(path.to_str().expect("utf-8 path")).expect("open store"));
        let db_path = path.clone();
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&store), timeout));
        let outbox = Arc::new(RecordingOutbox::new());
        let state = WebhookState::new(Arc::clone(&dispatcher), outbox.clone());

        Self {
            _dir: dir,
            db_path,
            store,
            dispatcher,
            outbox,
            state,
            next_update_id: std::sync::atomic::AtomicI64::new(1),
        }
    }

    pub fn router(&self) -> Router {
        web_server::router(self.state.clone())
    }

    /// Sends one request through the router and returns status and body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn post_webhook(&self, body: impl Into<String>) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .expect("request");
        self.request(request).await
    }

    /// Posts a text message from the test user and waits for the reply.
    pub async fn say(&self, text: &str) -> (StatusCode, String) {
        let update_id = self.next_update_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let result = self
            .post_webhook(create_message_json(update_id, TEST_CHAT_ID, TEST_USER_ID, text))
            .await;
        self.drain().await;
        result
    }

    /// Waits until every spawned reply has been handed to the outbox.
    pub async fn drain(&self) {
        self.state.tracker.close();
        self.state.tracker.wait().await;
        self.state.tracker.reopen();
    }

    /// Last recorded message text.
    pub fn last_text(&self) -> Option<String> {
        self.outbox.texts().pop()
    }
}
