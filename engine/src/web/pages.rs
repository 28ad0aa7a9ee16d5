//! HTML view handlers
//!
//! Every handler resumes the browser session from its cookie (creating one if
//! needed), holds that session's lock while it works, and renders one view.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use sdk::errors::{EngineError, ErrorExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::render::{ExtendOffer, Notice, PageContext, TurnView, View};
use super::{clear_session_cookie, session_cookie, session_id, set_session_cookie};
use super::{AppState, ChatService};
use crate::secrets::scrub;
use crate::session::{SessionContext, SessionHandle};
use crate::subscription::SubscriptionStatus;

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    user_id: String,
}

/// Session resumed for the duration of one request
struct Lease {
    id: Uuid,
    handle: SessionHandle,
    created: bool,
}

impl Lease {
    fn resume(state: &AppState, headers: &HeaderMap) -> Self {
        let (id, handle, created) = state.sessions.resume_or_create(session_cookie(headers));
        if created {
            debug!("Started session {}", id);
        }
        Self {
            id,
            handle,
            created,
        }
    }

    /// Render `view` and attach the session cookie for new sessions
    fn respond(
        self,
        state: &AppState,
        view: View,
        status: StatusCode,
        page: &PageContext,
    ) -> Response {
        let mut response = match state.renderer.render(view, page) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!("Failed to render {} view: {}", view.slug(), e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": e.user_hint()})),
                )
                    .into_response()
            }
        };

        if self.created {
            set_session_cookie(&mut response, self.id);
        }
        response
    }
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Chat view contents for the current session
fn chat_page(state: &AppState, session: &SessionContext) -> PageContext {
    PageContext {
        transcript: session.transcript.turns().iter().map(TurnView::from).collect(),
        chat_error: match &state.chat {
            ChatService::Enabled(_) => None,
            ChatService::Disabled(message) => Some(message.clone()),
        },
        max_input_chars: state.max_input_chars,
        ..Default::default()
    }
}

/// Notices for a subscription status, plus the extend offer when inactive
fn describe_status(
    state: &AppState,
    user_id: &str,
    status: SubscriptionStatus,
    page: &mut PageContext,
) {
    if let (true, Some(expires_at)) = (status.active, status.expires_at) {
        page.notices.push(Notice::success(format!(
            "Your subscription is active until {}",
            format_date(expires_at)
        )));
        return;
    }

    let expiry = status
        .expires_at
        .map(format_date)
        .unwrap_or_else(|| "N/A".to_string());
    page.notices.push(Notice::warning(format!(
        "Your subscription has expired. Expiry Date: {}",
        expiry
    )));
    page.extend_offer = Some(ExtendOffer {
        user_id: user_id.to_string(),
        label: state.extension_label(),
    });
}

/// GET / - render the selected view
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ViewQuery>,
) -> Response {
    let view = View::from_query(query.view.as_deref());
    let lease = Lease::resume(&state, &headers);
    let session = lease.handle.lock().await;

    let page = match view {
        View::Chat => chat_page(&state, &session),
        View::About => PageContext::default(),
        View::Login | View::Subscription => PageContext {
            user_id: session.logged_in_as.clone(),
            ..Default::default()
        },
    };
    drop(session);

    lease.respond(&state, view, StatusCode::OK, &page)
}

/// POST /chat - answer one message
///
/// The session lock is held across the provider call, so submissions within
/// one session are answered in order.
pub async fn chat_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let lease = Lease::resume(&state, &headers);
    let mut session = lease.handle.lock().await;

    let mut notices = Vec::new();
    let status = match &state.chat {
        ChatService::Disabled(message) => {
            warn!("Chat submission refused: {}", message);
            StatusCode::SERVICE_UNAVAILABLE
        }
        ChatService::Enabled(chain) => {
            match chain.predict(&mut session.transcript, &form.message).await {
                Ok(_) => StatusCode::OK,
                Err(e @ EngineError::InputRejected(_)) => {
                    notices.push(Notice::warning(e.to_string()));
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                Err(e) => {
                    error!("Conversation failed in session {}: {}", lease.id, e);
                    notices.push(Notice::error(format!(
                        "An error occurred during conversation: {}",
                        scrub(&e.to_string())
                    )));
                    StatusCode::BAD_GATEWAY
                }
            }
        }
    };

    let mut page = chat_page(&state, &session);
    page.notices = notices;
    drop(session);

    lease.respond(&state, View::Chat, status, &page)
}

/// POST /login - acknowledge a user id without any credential check
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UserForm>,
) -> Response {
    let lease = Lease::resume(&state, &headers);
    let mut session = lease.handle.lock().await;
    let user_id = form.user_id.trim();

    let mut page = PageContext::default();
    let status = if user_id.is_empty() {
        page.notices.push(Notice::warning("Please enter your user ID"));
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        info!("Session {} logged in as '{}'", lease.id, user_id);
        session.logged_in_as = Some(user_id.to_string());
        page.notices.push(Notice::success(format!("Logged in as {}", user_id)));
        StatusCode::OK
    };
    page.user_id = session.logged_in_as.clone();
    drop(session);

    lease.respond(&state, View::Login, status, &page)
}

/// POST /subscription/check
pub async fn subscription_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UserForm>,
) -> Response {
    let lease = Lease::resume(&state, &headers);
    let user_id = form.user_id.trim().to_string();

    let mut page = PageContext {
        user_id: Some(user_id.clone()),
        ..Default::default()
    };
    let status = match state.ledger.check(&user_id).await {
        Ok(status) => {
            describe_status(&state, &user_id, status, &mut page);
            StatusCode::OK
        }
        Err(e) => subscription_error(e, &mut page),
    };

    lease.respond(&state, View::Subscription, status, &page)
}

/// POST /subscription/extend - the payment step is a placeholder that always
/// succeeds
pub async fn subscription_extend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UserForm>,
) -> Response {
    let lease = Lease::resume(&state, &headers);
    let user_id = form.user_id.trim().to_string();
    let days = state.extension_days();

    let mut page = PageContext {
        user_id: Some(user_id.clone()),
        ..Default::default()
    };

    let result = match state.ledger.extend(&user_id, days).await {
        Ok(_) => state.ledger.check(&user_id).await,
        Err(e) => Err(e),
    };
    let status = match result {
        Ok(status) => {
            page.notices.push(Notice::success(format!(
                "Your subscription has been extended by {} days!",
                days
            )));
            describe_status(&state, &user_id, status, &mut page);
            StatusCode::OK
        }
        Err(e) => subscription_error(e, &mut page),
    };

    lease.respond(&state, View::Subscription, status, &page)
}

fn subscription_error(e: EngineError, page: &mut PageContext) -> StatusCode {
    match e {
        EngineError::InputRejected(_) => {
            page.notices.push(Notice::warning("Please enter your user ID"));
            StatusCode::UNPROCESSABLE_ENTITY
        }
        e => {
            error!("Subscription request failed: {}", e);
            page.notices.push(Notice::error(e.user_hint()));
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /session/end - discard the session and its transcript
pub async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.end(id);
    }

    let mut response = Redirect::to("/").into_response();
    clear_session_cookie(&mut response);
    response
}
