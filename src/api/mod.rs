// HTTP surface: the interaction relay used by the chat-platform adapter,
// plus health and metrics.

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::{hash_token, RelayAuth};
use crate::commands::{self, AppContext, Caller, Command};
use crate::metrics;
use crate::report::Reply;

// ── Request types ─────────────────────────────────────────────────────

/// One slash-command invocation forwarded by the platform adapter.
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub caller_id: String,
    #[serde(default)]
    pub caller_name: Option<String>,
    pub command: Command,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub ctx: AppContext,
    /// SHA-256 of the bot token, hex encoded.
    pub token_digest: String,
}

impl AppState {
    pub fn new(ctx: AppContext, bot_token: &str) -> Self {
        Self {
            ctx,
            token_digest: hash_token(bot_token),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/api/interactions", post(handle_interaction))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "clan-bot" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn handle_interaction(
    State(state): State<AppState>,
    _relay: RelayAuth,
    Json(req): Json<InteractionRequest>,
) -> Json<Reply> {
    let caller = Caller {
        id: req.caller_id,
        display_name: req.caller_name,
    };
    Json(commands::dispatch(&state.ctx, &caller, req.command).await)
}
