//! HTTP surface: one page that shows either the email gate or the generator.

mod handlers;
mod render;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::gate::AccessGate;
use crate::image::providers::GeminiProviderFactory;
use crate::mailing::MailerLiteClient;
use crate::session::SessionStore;
use crate::workflow::GenerationWorkflow;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "tindergen_session";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    gate: AccessGate,
    workflow: GenerationWorkflow,
}

impl AppState {
    /// Wires the gate and the workflow to a session store.
    pub fn new(
        sessions: Arc<SessionStore>,
        gate: AccessGate,
        workflow: GenerationWorkflow,
    ) -> Self {
        Self {
            sessions,
            gate,
            workflow,
        }
    }

    /// Builds the production wiring: MailerLite for the gate, Gemini for the workflow.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let subscriber = MailerLiteClient::builder()
            .api_key(&config.mailerlite_api_key)
            .group_id(&config.mailerlite_group_id)
            .base_url(&config.mailerlite_base_url)
            .build()?;
        let factory = GeminiProviderFactory::new().with_base_url(&config.gemini_base_url);

        Ok(Self::new(
            Arc::new(SessionStore::new(config.session_ttl)),
            AccessGate::new(Arc::new(subscriber)),
            GenerationWorkflow::new(Arc::new(factory)),
        ))
    }

    /// The session registry.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }
}

/// Builds the router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/subscribe", post(handlers::subscribe))
        .route("/generate", post(handlers::generate))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `config.bind` and serves until the process is stopped.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let app = router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "tindergen listening");
    axum::serve(listener, app).await
}
