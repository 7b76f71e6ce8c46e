//! Agora server library logic.

pub mod api;
pub mod api_facilitation;
pub mod api_sse;
pub mod api_threads;
pub mod config;
pub mod transport;

use agora_db::DbPool;
use agora_evidence::{EvidenceError, EvidenceSource};
use agora_facilitator::{
    FactChecker, InterventionPolicy, Orchestrator, SqliteStore, Summarizer,
};
use agora_gateway::{GatewayError, ModelGateway, OllamaBackend};
use agora_types::EventContext;
use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use transport::BroadcastNotifier;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The facilitation engine.
    pub orchestrator: Orchestrator,
    /// Model gateway, kept for health checks.
    pub gateway: ModelGateway,
    /// Fan-out of facilitator notifications to SSE subscribers.
    pub notifier: Arc<BroadcastNotifier>,
    /// Whether posts and reactions trigger facilitation.
    pub facilitation_enabled: bool,
}

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize model gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("failed to initialize evidence search: {0}")]
    Evidence(#[from] EvidenceError),
}

impl AppState {
    /// Wires the facilitator from its parts. Tests pass fake gateways and
    /// evidence sources here.
    pub fn new(
        pool: DbPool,
        gateway: ModelGateway,
        evidence: EvidenceSource,
        notifier: Arc<BroadcastNotifier>,
        facilitation_enabled: bool,
    ) -> Self {
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let orchestrator = Orchestrator::new(
            store.clone(),
            notifier.clone(),
            InterventionPolicy,
            Summarizer::new(store, gateway.clone()),
            FactChecker::new(evidence, gateway.clone()),
        );
        Self {
            pool,
            orchestrator,
            gateway,
            notifier,
            facilitation_enabled,
        }
    }

    /// Builds the production state: Ollama backend plus the configured
    /// search chain.
    pub fn from_config(pool: DbPool, config: &config::Config) -> Result<Self, StartupError> {
        let backend = Arc::new(OllamaBackend::new(&config.model.url)?);
        let gateway = ModelGateway::new(backend, config.model.gateway_config());
        let evidence = EvidenceSource::from_config(&config.search.search_config())?;
        tracing::info!(
            model_url = %config.model.url,
            default_model = %config.model.default_model,
            search_backends = ?evidence.backend_names(),
            "facilitator configured"
        );
        let notifier = Arc::new(BroadcastNotifier::new(
            config.facilitator.notification_buffer,
        ));
        Ok(Self::new(
            pool,
            gateway,
            evidence,
            notifier,
            config.facilitator.enabled,
        ))
    }

    /// Runs the facilitator for `event` on a spawned task.
    pub fn facilitate_in_background(&self, thread_id: &str, event: EventContext) {
        if !self.facilitation_enabled {
            return;
        }
        let orchestrator = self.orchestrator.clone();
        let thread_id = thread_id.to_string();
        tokio::spawn(async move {
            let report = orchestrator.handle_event(&thread_id, event).await;
            tracing::debug!(
                thread_id = %thread_id,
                intervened = report.intervened,
                action = report.action.as_str(),
                "background facilitation finished"
            );
        });
    }
}

/// Maximum request body size (256 KiB).
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Health check handler. Reports model backend reachability without failing.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let model = match state.gateway.health().await {
        Ok(models) => {
            let default_model = state.gateway.default_model();
            let available = models
                .iter()
                .any(|m| m == default_model || m.split(':').next() == Some(default_model));
            json!({
                "reachable": true,
                "default_model": default_model,
                "default_model_available": available,
            })
        }
        Err(e) => json!({
            "reachable": false,
            "default_model": state.gateway.default_model(),
            "error": e.to_string(),
        }),
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": model,
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/threads",
            post(api_threads::create_thread_handler).get(api_threads::list_threads_handler),
        )
        .route(
            "/api/threads/{threadId}",
            get(api_threads::get_thread_handler),
        )
        .route(
            "/api/threads/{threadId}/settings",
            patch(api_threads::update_settings_handler),
        )
        .route(
            "/api/threads/{threadId}/messages",
            post(api_threads::post_message_handler).get(api_threads::list_messages_handler),
        )
        .route(
            "/api/threads/{threadId}/messages/{messageId}",
            delete(api_threads::delete_message_handler),
        )
        .route(
            "/api/threads/{threadId}/messages/{messageId}/reactions",
            post(api_facilitation::react_handler),
        )
        .route(
            "/api/threads/{threadId}/facilitate",
            post(api_facilitation::facilitate_handler),
        )
        .route(
            "/api/threads/{threadId}/claims",
            get(api_facilitation::list_claims_handler),
        )
        .route(
            "/api/threads/{threadId}/events",
            get(api_sse::thread_events_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
