//! Web front-end
//!
//! Serves the four views (chat, about, login, subscription) as server-rendered
//! HTML plus a small JSON API.
//!
//! # Endpoints
//!
//! - GET  /?view=chat|about|login|subscription - Render a view
//! - POST /chat - Submit a chat message (form field `message`)
//! - POST /login - Acknowledge a user id (form field `user_id`)
//! - POST /subscription/check - Check a user's subscription
//! - POST /subscription/extend - Grant one extension period
//! - POST /session/end - Discard the browser session
//! - GET  /api/status - Server status
//! - GET  /api/transcript - Transcript of the current session
//!
//! Browser sessions are identified by the `ecopyright_session` cookie.

pub mod api;
pub mod pages;
pub mod render;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
    routing::{get, post},
    Router,
};
use sdk::errors::EngineError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::conversation::ConversationChain;
use crate::session::SessionStore;
use crate::subscription::SubscriptionLedger;
use render::Renderer;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "ecopyright_session";

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Whether the chat view can talk to the completion provider
#[derive(Clone)]
pub enum ChatService {
    Enabled(Arc<ConversationChain>),

    /// Chat is off because of a configuration error; holds the message shown
    /// to the user
    Disabled(String),
}

impl ChatService {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ChatService::Enabled(_))
    }
}

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub ledger: Arc<SubscriptionLedger>,
    pub sessions: Arc<SessionStore>,
    renderer: Arc<Renderer>,
    extension_days: i64,
    price_label: String,
    max_input_chars: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        chat: ChatService,
        ledger: Arc<SubscriptionLedger>,
        sessions: Arc<SessionStore>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            chat,
            ledger,
            sessions,
            renderer: Arc::new(Renderer::new()?),
            extension_days: config.subscription.extension_days,
            price_label: config.subscription.price_label.clone(),
            max_input_chars: config.conversation.max_input_chars,
        })
    }

    pub fn extension_days(&self) -> i64 {
        self.extension_days
    }

    /// Label of the extend button, e.g. "Extend Subscription (30 days for $10)"
    pub fn extension_label(&self) -> String {
        format!(
            "Extend Subscription ({} days for {})",
            self.extension_days, self.price_label
        )
    }
}

/// Build the router with every route and the request trace layer
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/chat", post(pages::chat_submit))
        .route("/login", post(pages::login))
        .route("/subscription/check", post(pages::subscription_check))
        .route("/subscription/extend", post(pages::subscription_extend))
        .route("/session/end", post(pages::end_session))
        .route("/api/status", get(api::status_handler))
        .route("/api/transcript", get(api::transcript_handler))
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Value of the session cookie, if the request carries one
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
}

/// Parse the session cookie into an id
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    session_cookie(headers).and_then(|value| Uuid::parse_str(value.trim()).ok())
}

pub(crate) fn set_session_cookie(response: &mut Response, id: Uuid) {
    let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

pub(crate) fn clear_session_cookie(response: &mut Response) {
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Running web server
pub struct WebServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
    sweeper: JoinHandle<()>,
}

impl WebServer {
    /// Bind `host:port` and start serving. Port 0 picks a free port.
    pub async fn start(host: &str, port: u16, state: AppState) -> Result<Self, EngineError> {
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(|e| EngineError::Network(format!("Failed to bind to {}:{}: {}", host, port, e)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;

        let sessions = Arc::clone(&state.sessions);
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                sessions.sweep_idle();
            }
        });

        let app = build_router(state);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = tokio::spawn(async move {
            tracing::info!("Web server listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                    tracing::info!("Web server shutting down gracefully");
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Web server error: {}", e);
                });
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
            sweeper,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn stop(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            shutdown_tx.send(()).ok();
        }
        if let Some(server) = self.server.take() {
            if let Err(e) = server.await {
                tracing::error!("Web server task failed: {}", e);
            }
        }
        self.sweeper.abort();
        tracing::info!("Web server stopped");
    }
}
