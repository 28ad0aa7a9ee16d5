//! HTML rendering for the four views
//!
//! Templates are compiled into the binary and auto-escaped, so transcript
//! content and user ids are always inserted as text.

use minijinja::{context, Environment};
use sdk::errors::EngineError;
use sdk::types::Turn;
use serde::Serialize;

/// The four pages reachable from the sidebar menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Chat,
    About,
    Login,
    Subscription,
}

impl View {
    pub const ALL: [View; 4] = [View::Chat, View::About, View::Login, View::Subscription];

    /// Parse a `?view=` value. Unknown or missing values select the chat.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("about") => View::About,
            Some("login") => View::Login,
            Some("subscription") => View::Subscription,
            _ => View::Chat,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            View::Chat => "chat",
            View::About => "about",
            View::Login => "login",
            View::Subscription => "subscription",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Chat => "Chatbot",
            View::About => "About Us",
            View::Login => "Login",
            View::Subscription => "Subscription",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            View::Chat => "chat.html",
            View::About => "about.html",
            View::Login => "login.html",
            View::Subscription => "subscription.html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// Banner shown above the view content
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// One transcript line as displayed
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub label: &'static str,
    pub content: String,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            label: turn.role().display_label(),
            content: turn.content().to_string(),
        }
    }
}

/// Offer to extend a lapsed subscription
#[derive(Debug, Clone, Serialize)]
pub struct ExtendOffer {
    pub user_id: String,
    pub label: String,
}

/// Everything a view template may read
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageContext {
    pub notices: Vec<Notice>,
    pub transcript: Vec<TurnView>,
    pub chat_error: Option<String>,
    pub max_input_chars: usize,
    pub user_id: Option<String>,
    pub extend_offer: Option<ExtendOffer>,
}

#[derive(Serialize)]
struct MenuItem {
    slug: &'static str,
    label: &'static str,
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, EngineError> {
        let mut env = Environment::new();
        let templates = [
            ("layout.html", include_str!("templates/layout.html")),
            ("chat.html", include_str!("templates/chat.html")),
            ("about.html", include_str!("templates/about.html")),
            ("login.html", include_str!("templates/login.html")),
            ("subscription.html", include_str!("templates/subscription.html")),
        ];
        for (name, source) in templates {
            env.add_template(name, source)
                .map_err(|e| EngineError::Render(format!("template {}: {}", name, e)))?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, view: View, page: &PageContext) -> Result<String, EngineError> {
        let menu: Vec<MenuItem> = View::ALL
            .iter()
            .map(|v| MenuItem {
                slug: v.slug(),
                label: v.label(),
            })
            .collect();

        self.env
            .get_template(view.template())
            .and_then(|tmpl| {
                tmpl.render(context! {
                    view => view.slug(),
                    menu => menu,
                    page => page,
                })
            })
            .map_err(|e| EngineError::Render(e.to_string()))
    }
}
