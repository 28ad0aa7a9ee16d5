//! JSON endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sdk::errors::{EngineError, ErrorExt};
use serde_json::json;

use super::{session_id, AppState, ChatService};

/// Server status API endpoint
pub async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let chat = match &state.chat {
        ChatService::Enabled(chain) => json!({
            "enabled": true,
            "provider": chain.provider_name(),
            "model": chain.model(),
        }),
        ChatService::Disabled(message) => json!({
            "enabled": false,
            "error": message,
        }),
    };

    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_HASH"),
        "chat": chat,
        "sessions": state.sessions.len(),
        "subscriptions": state.ledger.record_count().await,
    }))
}

/// Transcript of the session named by the cookie
pub async fn transcript_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = match session_id(&headers)
        .ok_or_else(|| EngineError::SessionNotFound("no session cookie".to_string()))
        .and_then(|id| state.sessions.get(id))
    {
        Ok(handle) => handle,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": e.user_hint()})),
            )
                .into_response();
        }
    };

    let session = handle.lock().await;
    Json(json!({
        "session": session.id(),
        "created_at": session.created_at(),
        "logged_in_as": session.logged_in_as,
        "turns": session.transcript.turns(),
    }))
    .into_response()
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
}
