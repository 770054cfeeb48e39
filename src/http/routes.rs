//! HTTP Routes
//!
//! The axum router: `POST /api/chat`, `POST /api/redmine-cache` (legacy
//! route name, kept as a wire contract), `GET /api/health`, and
//! `GET /api/tools`. Tool-level failures never surface as HTTP errors; only
//! upstream rate limits (429) and internal failures (500) map to statuses.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::services::chat::{run_chat, HistoryEntry};
use crate::services::tools::impls::cache::cache_control_action;
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "conversationHistory", default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(rename = "enabledTools", default)]
    pub enabled_tools: HashMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(rename = "conversationHistory")]
    pub conversation_history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CacheControlRequest {
    #[serde(default = "default_action")]
    pub action: String,
}

fn default_action() -> String {
    "status".to_string()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/redmine-cache", post(cache_control))
        .route("/api/health", get(health))
        .route("/api/tools", get(list_tools))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), cors))
        .with_state(state)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let token = CancellationToken::new();
    let tool_ctx = state.tool_context(token.clone());
    // A dropped connection drops this future; the guard flips the token so
    // in-flight tool calls abandon work at their next await.
    let _cancel_guard = token.drop_guard();

    let outcome = run_chat(
        &state.config,
        state.llm.as_ref(),
        &state.registry,
        &tool_ctx,
        &request.message,
        &request.conversation_history,
        &request.enabled_tools,
    )
    .await;

    match outcome {
        Ok(outcome) => Json(ChatResponse {
            response: outcome.response,
            conversation_history: outcome.history,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn cache_control(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CacheControlRequest>,
) -> Response {
    Json(cache_control_action(&state.cache, &request.action).await).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime_s": state.uptime_seconds(),
    }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let tools: Vec<_> = state
        .registry
        .catalogue()
        .into_iter()
        .map(|(name, description, category)| {
            json!({
                "name": name,
                "description": description,
                "category": category.as_str(),
            })
        })
        .collect();
    Json(json!({ "tools": tools }))
}

fn error_response(err: AppError) -> Response {
    let status = match err.kind() {
        "llm_rate_limited" | "tracker_rate_limited" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(kind = err.kind(), error = %err, "request failed");
    (
        status,
        Json(json!({ "detail": err.to_string(), "kind": err.kind() })),
    )
        .into_response()
}

/// Allow-list CORS: echo the origin back when it is configured, answer
/// preflights directly.
async fn cors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let allowed = origin
        .as_deref()
        .map(|o| state.config.allowed_origins.iter().any(|a| a == o))
        .unwrap_or(false);
    let is_preflight = request.method() == Method::OPTIONS;

    let mut response = if is_preflight {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if allowed {
        if let Some(origin) = origin {
            if let Ok(value) = HeaderValue::from_str(&origin) {
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static("GET, POST, OPTIONS"),
                );
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("content-type, authorization"),
                );
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
    }
    response
}
