//! HTTP gateway for AgentChat.
//!
//! Serves the embedded chat UI, a health check, and the v1 session API.
//! Built on Axum.

pub mod api_v1;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use agentchat_agent::AgentRegistry;
use agentchat_config::AppConfig;
use agentchat_tools::McpLauncher;

/// Gateway startup failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Backend setup failed: {0}")]
    Backend(#[from] agentchat_core::ProviderError),

    #[error("Agent setup failed: {0}")]
    Agent(#[from] agentchat_core::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the full router: health, v1 API, and the embedded frontend.
///
/// Layers applied:
/// - Request body size limit (64 KB; prompts are short)
/// - Permissive CORS when enabled in config
/// - HTTP trace logging
pub fn build_router(api_state: api_v1::SharedApiState) -> Router {
    let cors_enabled = api_state.config.gateway.cors;

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(api_state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(64 * 1024));

    let router = if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .max_age(std::time::Duration::from_secs(3600)),
        )
    } else {
        router
    };

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire the remote backends and the tool launcher into an agent registry.
pub async fn build_registry(config: &AppConfig) -> Result<AgentRegistry, GatewayError> {
    let backends = agentchat_providers::build_from_config(config).await?;
    let launcher = McpLauncher::new().with_call_timeout(config.agentic.tool_timeout());
    Ok(AgentRegistry::from_config(
        config,
        backends.agents,
        backends.model,
        Arc::new(launcher),
    )?)
}

/// Wire backends from config and serve until the listener fails.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let registry = build_registry(&config).await?;

    let state = Arc::new(api_v1::ApiState::new(config, Arc::new(registry)));
    let app = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
