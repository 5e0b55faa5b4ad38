//! The HTTP bot and its routes.
//!
//! ```text
//! GET  /        → "Hello, world!"
//! GET  /action  → submission form + actions executed on this bot
//! POST /action  → form-encoded action, reported to the router
//! ```

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::Html,
    routing::get,
};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modfed_core::{
    ActionSink, AdapterError, AdapterResult, BotAdapter, ConfigurableBot, ModerationAction,
};

use crate::config::HttpBotConfig;
use crate::form::ActionForm;

/// State shared with the axum handlers.
struct HttpBotState {
    sink: RwLock<Option<ActionSink>>,
    executed: Mutex<VecDeque<ModerationAction>>,
    max_listed: usize,
}

impl HttpBotState {
    fn new(max_listed: usize) -> Self {
        Self {
            sink: RwLock::new(None),
            executed: Mutex::new(VecDeque::with_capacity(max_listed)),
            max_listed,
        }
    }

    fn record(&self, action: ModerationAction) {
        if self.max_listed == 0 {
            return;
        }
        let mut executed = self.executed.lock();
        if executed.len() == self.max_listed {
            executed.pop_front();
        }
        executed.push_back(action);
    }

    fn snapshot(&self) -> Vec<ModerationAction> {
        self.executed.lock().iter().cloned().collect()
    }
}

struct ServerHandle {
    addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// A bot whose moderation surface is a small web form.
pub struct HttpBot {
    config: HttpBotConfig,
    state: Arc<HttpBotState>,
    server: Mutex<Option<ServerHandle>>,
}

impl HttpBot {
    pub fn new(config: HttpBotConfig) -> Self {
        Self {
            state: Arc::new(HttpBotState::new(config.max_listed_actions)),
            config,
            server: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HttpBotConfig {
        &self.config
    }

    /// Address the server is bound to, while connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|server| server.addr)
    }

    /// The most recent actions executed on this bot, oldest first.
    pub fn executed(&self) -> Vec<ModerationAction> {
        self.state.snapshot()
    }
}

fn routes(state: Arc<HttpBotState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/action", get(show_actions).post(submit_action))
        .with_state(state)
}

#[async_trait]
impl BotAdapter for HttpBot {
    async fn connect(&self, actions: ActionSink) -> AdapterResult<()> {
        if self.server.lock().is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| {
                AdapterError::connection(format!(
                    "Failed to bind {}:{}: {e}",
                    self.config.host, self.config.port
                ))
            })?;
        let addr = listener.local_addr()?;

        *self.state.sink.write() = Some(actions);

        let token = CancellationToken::new();
        let shutdown = token.clone().cancelled_owned();
        let router = routes(Arc::clone(&self.state));
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "HTTP bot server error");
            }
        });

        *self.server.lock() = Some(ServerHandle { addr, token, task });
        info!(addr = %addr, "HTTP bot listening");
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        let server = self.server.lock().take();
        let Some(ServerHandle { addr, token, task }) = server else {
            return Ok(());
        };

        token.cancel();
        if let Err(e) = task.await {
            warn!(addr = %addr, error = %e, "HTTP bot server task ended abnormally");
        }
        self.state.sink.write().take();
        info!(addr = %addr, "HTTP bot stopped");
        Ok(())
    }

    async fn execute(&self, action: &ModerationAction) -> AdapterResult<()> {
        debug!(action = %action, "Recording executed action");
        self.state.record(action.clone());
        Ok(())
    }
}

impl ConfigurableBot for HttpBot {
    type Config = HttpBotConfig;

    fn adapter_name() -> &'static str {
        "http"
    }

    fn from_config(config: Self::Config) -> AdapterResult<Self> {
        if config.host.trim().is_empty() {
            return Err(AdapterError::invalid_config("http bot host cannot be empty"));
        }
        Ok(Self::new(config))
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn hello() -> &'static str {
    "Hello, world!"
}

async fn show_actions(State(state): State<Arc<HttpBotState>>) -> Html<String> {
    Html(render_page(&state.snapshot()))
}

async fn submit_action(
    State(state): State<Arc<HttpBotState>>,
    form: Result<Form<ActionForm>, FormRejection>,
) -> (StatusCode, String) {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return (StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let action = match form.into_action() {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, "Rejected action submission");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    info!(action = %action, "Received action");
    let sink = state.sink.read().clone();
    match sink {
        Some(sink) => {
            sink.report(action);
        }
        None => warn!("HTTP bot is not connected, dropping submitted action"),
    }
    (StatusCode::OK, "Action received".to_string())
}

const FORM_FIELDS: [(&str, &str, bool); 8] = [
    ("action_type", "Action Type", true),
    ("target_user_id", "Target User ID", true),
    ("action_moderator_id", "Moderator ID", true),
    ("action_reason", "Reason", true),
    ("action_reason_type", "Reason Type", true),
    ("action_context", "Context", false),
    ("can_appeal", "Can Appeal", false),
    ("timeout_duration", "Timeout (seconds)", false),
];

fn render_page(executed: &[ModerationAction]) -> String {
    let mut page = String::from(
        "<html>\n<body>\n<h1>Submit Moderation Action</h1>\n<form method=\"post\" action=\"/action\">\n",
    );
    for (name, label, required) in FORM_FIELDS {
        let required = if required { " required" } else { "" };
        let _ = writeln!(
            page,
            "<label for=\"{name}\">{label}:</label>\n<input type=\"text\" id=\"{name}\" name=\"{name}\"{required}>"
        );
    }
    page.push_str("<button type=\"submit\">Submit</button>\n</form>\n<h1>Taken Actions</h1>\n<ul>\n");
    for action in executed {
        let _ = writeln!(page, "<li>{}</li>", escape_html(&action.to_string()));
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    page
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
