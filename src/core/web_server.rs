//! HTTP server: Telegram webhook endpoint, liveness and Prometheus metrics
//!
//! Endpoints:
//! - `GET /` - liveness, fixed text
//! - `POST /webhook` - one Telegram update per request, always answered `200 OK`
//! - `GET /metrics` - Prometheus text exposition

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;

use crate::core::config::WEBHOOK_PATH;
use crate::core::error::{AppError, AppResult};
use crate::core::metrics;
use crate::telegram::dispatcher::CommandDispatcher;
use crate::telegram::outbox::{deliver, Outbox};
use crate::telegram::types::{IncomingMessage, WebhookUpdate};

/// Body of `GET /`
pub const LIVENESS_TEXT: &str = "OPI Bot running";

/// Shared state of the webhook server
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<CommandDispatcher>,
    pub outbox: Arc<dyn Outbox>,
    /// Outbound sends still in flight; drained on shutdown
    pub tracker: TaskTracker,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<CommandDispatcher>, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            dispatcher,
            outbox,
            tracker: TaskTracker::new(),
        }
    }
}

/// Builds the router. Kept separate from [`serve`] so tests can drive it
/// without binding a socket.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route(WEBHOOK_PATH, post(webhook_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serves the router on `0.0.0.0:port` until `shutdown` resolves, then
/// waits for pending replies to be sent.
pub async fn serve<F>(port: u16, state: WebhookState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let tracker = state.tracker.clone();

    log::info!("Starting web server on http://{}", addr);
    log::info!("  POST {} - Telegram updates", WEBHOOK_PATH);
    log::info!("  GET  /metrics - Prometheus metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await?;

    tracker.close();
    log::info!("Waiting for {} pending replies", tracker.len());
    tracker.wait().await;
    log::info!("Web server stopped");

    Ok(())
}

async fn root_handler() -> &'static str {
    LIVENESS_TEXT
}

/// Handler for the webhook endpoint
///
/// The update is dispatched before the response is returned, so store
/// mutations are visible once Telegram gets its `200`. Only the outbound
/// reply runs in the background.
async fn webhook_handler(State(state): State<WebhookState>, body: Bytes) -> &'static str {
    metrics::UPDATES_RECEIVED_TOTAL.inc();

    let update: WebhookUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            metrics::UPDATES_MALFORMED_TOTAL.inc();
            log::warn!("Ignoring malformed update ({} bytes): {}", body.len(), AppError::from(e));
            return "OK";
        }
    };

    let Some(message) = update.message else {
        log::debug!("Update {} carries no message, ignored", update.update_id);
        return "OK";
    };

    let incoming = IncomingMessage::from(message);
    if let Some(reply) = state.dispatcher.handle(&incoming) {
        let outbox = Arc::clone(&state.outbox);
        let chat_id = incoming.chat_id;
        state.tracker.spawn(async move {
            deliver(outbox.as_ref(), chat_id, reply).await;
        });
    }

    "OK"
}

/// Handler for /metrics endpoint
async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}
