//! HTTP API v1 for the chat UI.
//!
//! Endpoints:
//!
//! - `GET  /v1/agents`: Configured agent profiles
//! - `POST /v1/sessions`: Open a chat session
//! - `GET  /v1/sessions/{id}`: Snapshot of a session
//! - `POST /v1/sessions/{id}/messages`: Submit a prompt (202, answered in the background)
//! - `GET  /v1/sessions/{id}/events`: SSE drain of the in-flight answer

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use agentchat_agent::{AgentRegistry, ChatEvent, ChatSnapshot, RenderSink, StreamingCoordinator};
use agentchat_config::{AgentKind, AppConfig};
use agentchat_core::error::{Error, ValidationError};
use agentchat_core::message::ConversationStore;

// ── State ─────────────────────────────────────────────────────────────────

struct SessionEntry {
    coordinator: Arc<StreamingCoordinator>,
    created_at: DateTime<Utc>,
}

/// Shared state for the v1 API.
pub struct ApiState {
    pub config: AppConfig,
    pub registry: Arc<AgentRegistry>,
    store: Arc<ConversationStore>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl ApiState {
    pub fn new(config: AppConfig, registry: Arc<AgentRegistry>) -> Self {
        let store = match config.chat.history_limit {
            Some(limit) => ConversationStore::new().with_history_limit(limit),
            None => ConversationStore::new(),
        };
        Self {
            config,
            registry,
            store: Arc::new(store),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn coordinator(&self, id: &str) -> Result<Arc<StreamingCoordinator>, ApiError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.coordinator.clone())
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Unknown session: {id}")))
    }
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/agents", get(list_agents_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/sessions/{id}/messages", post(submit_message_handler))
        .route("/sessions/{id}/events", get(events_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

/// Map a submission error onto an HTTP status.
fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(ValidationError::UnknownProfile(_)) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Busy => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Agents ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentDto {
    pub key: String,
    pub name: String,
    pub kind: AgentKind,
    pub instructions: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub agents: Vec<AgentDto>,
}

async fn list_agents_handler(State(state): State<SharedApiState>) -> Json<AgentListResponse> {
    let agents = state
        .registry
        .profiles()
        .map(|(key, profile)| AgentDto {
            key: key.to_string(),
            name: profile.name.clone(),
            kind: profile.kind,
            instructions: profile.instructions.clone(),
        })
        .collect();
    Json(AgentListResponse { agents })
}

// ── Sessions ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub user_id: String,
}

async fn create_session_handler(
    State(state): State<SharedApiState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let user_id = format!("user-{}", uuid::Uuid::new_v4().simple());

    let coordinator = Arc::new(StreamingCoordinator::new(
        &user_id,
        &session_id,
        state.store.clone(),
        &state.config.chat,
    ));

    let mut sessions = state.sessions.write().await;

    // Evict oldest if at capacity
    if sessions.len() >= state.config.gateway.max_sessions {
        if let Some(oldest_key) = sessions
            .iter()
            .min_by_key(|(_, s)| s.created_at)
            .map(|(k, _)| k.clone())
        {
            debug!(session_id = %oldest_key, "Evicting oldest session");
            sessions.remove(&oldest_key);
        }
    }

    sessions.insert(
        session_id.clone(),
        SessionEntry {
            coordinator,
            created_at: Utc::now(),
        },
    );
    info!(session_id = %session_id, user_id = %user_id, "Session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id, user_id }),
    )
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let coordinator = state.coordinator(&id).await?;
    Ok(Json(coordinator.snapshot()))
}

// ── Messages ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
    pub agent: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub session_id: String,
    pub accepted: bool,
}

/// `POST /v1/sessions/{id}/messages`: validate, store, and start answering.
async fn submit_message_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let coordinator = state.coordinator(&id).await?;

    let submitted = state
        .registry
        .strategy(&payload.agent)
        .and_then(|strategy| coordinator.submit(&payload.prompt, strategy));

    match submitted {
        Ok(()) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                session_id: id,
                accepted: true,
            }),
        )),
        Err(e) => {
            let status = status_for(&e);
            warn!(session_id = %id, agent = %payload.agent, status = %status, error = %e, "Submission rejected");
            Err(api_error(status, e.to_string()))
        }
    }
}

// ── SSE drain ─────────────────────────────────────────────────────────────

/// Forwards drained fragments into the SSE channel.
struct ChannelSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl RenderSink for ChannelSink {
    fn render(&self, fragment: &str, pending: &str) {
        // A closed channel means the client went away; the drain still runs
        // so the session's flags settle.
        let _ = self.tx.send(ChatEvent::Fragment {
            text: fragment.to_string(),
            pending: pending.to_string(),
        });
    }

    fn error(&self, message: &str) {
        let _ = self.tx.send(ChatEvent::Error {
            message: message.to_string(),
        });
    }
}

/// `GET /v1/sessions/{id}/events`: stream the in-flight answer as SSE.
///
/// The stream ends with a `done` event carrying the stored transcript.
async fn events_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let coordinator = state.coordinator(&id).await?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let sink = ChannelSink { tx };
        coordinator.drain(&sink).await;
        let _ = sink.tx.send(ChatEvent::Done {
            messages: coordinator.snapshot().messages,
        });
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_agent::{AgenticLoop, DirectInvoker, TaskPool};
    use agentchat_config::AgentProfile;
    use agentchat_core::error::ProviderError;
    use agentchat_core::provider::{
        AgentInvocation, AgentRuntime, AgentSummary, ContentBlock, EventFrame, FrameStream,
        ModelClient, ModelRequest, ModelResponse,
    };
    use agentchat_core::tool::{SessionLauncher, SessionSpec, ToolCatalog, ToolSession};
    use agentchat_core::SessionError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;

    struct MockRuntime {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl AgentRuntime for MockRuntime {
        fn name(&self) -> &str {
            "mock"
        }

        async fn list_agents(&self) -> Result<Vec<AgentSummary>, ProviderError> {
            // Keeps the worker in flight long enough to observe it.
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![AgentSummary {
                id: "AGT-1".into(),
                name: "helpdesk-agent".into(),
            }])
        }

        async fn list_aliases(&self, _agent_id: &str) -> Result<Vec<AgentSummary>, ProviderError> {
            Ok(vec![AgentSummary {
                id: "AL-1".into(),
                name: "latest".into(),
            }])
        }

        async fn invoke(&self, _invocation: AgentInvocation) -> Result<FrameStream, ProviderError> {
            let frames: Vec<Result<EventFrame, ProviderError>> = self
                .chunks
                .iter()
                .map(|c| Ok(EventFrame::with_payload(c.as_bytes().to_vec())))
                .collect();
            Ok(Box::pin(futures::stream::iter(frames)))
        }
    }

    struct MockModel;

    #[async_trait]
    impl ModelClient for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        async fn invoke(&self, _request: ModelRequest) -> Result<ModelResponse, ProviderError> {
            Ok(ModelResponse {
                content: vec![ContentBlock::text("from tools")],
                stop_reason: Some("end_turn".into()),
            })
        }
    }

    struct MockSession;

    #[async_trait]
    impl ToolSession for MockSession {
        async fn discover(&self) -> agentchat_core::Result<ToolCatalog> {
            Ok(ToolCatalog::default())
        }

        async fn execute(&self, name: &str, _arguments: serde_json::Value) -> String {
            format!("ran {name}")
        }

        async fn close(&self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    struct MockLauncher;

    #[async_trait]
    impl SessionLauncher for MockLauncher {
        async fn launch(&self, _spec: &SessionSpec) -> agentchat_core::Result<Box<dyn ToolSession>> {
            Ok(Box::new(MockSession))
        }
    }

    fn test_config(max_sessions: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.gateway.max_sessions = max_sessions;
        config.chat.poll_interval_ms = 5;
        config.agents = BTreeMap::from([
            (
                "helpdesk".to_string(),
                AgentProfile {
                    name: "Helpdesk".into(),
                    kind: AgentKind::Bedrock,
                    instructions: "Answers support questions".into(),
                    alias: "latest".into(),
                    ..AgentProfile::default()
                },
            ),
            (
                "files".to_string(),
                AgentProfile {
                    name: "Files".into(),
                    kind: AgentKind::Mcp,
                    alias: "latest".into(),
                    command: Some(PathBuf::from("/bin/sh")),
                    scripts: vec![PathBuf::from("/bin/sh")],
                    system_prompt: Some("Use the tools.".into()),
                    ..AgentProfile::default()
                },
            ),
        ]);
        config
    }

    fn test_api_state(max_sessions: usize) -> SharedApiState {
        let config = test_config(max_sessions);
        let registry = AgentRegistry::new(
            config.agents.clone(),
            Arc::new(DirectInvoker::new(Arc::new(MockRuntime {
                chunks: vec!["Hel", "lo"],
            }))),
            Arc::new(AgenticLoop::new(Arc::new(MockModel), Arc::new(MockLauncher))),
            Arc::new(TaskPool::new(1, Duration::from_secs(5)).unwrap()),
        );
        Arc::new(ApiState::new(config, Arc::new(registry)))
    }

    async fn create_session(app: &Router) -> CreateSessionResponse {
        let req = Request::builder()
            .method("POST")
            .uri("/sessions")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn submit(session_id: &str, prompt: &str, agent: &str) -> Request<Body> {
        let body = serde_json::json!({ "prompt": prompt, "agent": agent });
        Request::builder()
            .method("POST")
            .uri(format!("/sessions/{session_id}/messages"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn drain_events(app: &Router, session_id: &str) -> String {
        let req = Request::builder()
            .uri(format!("/sessions/{session_id}/events"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&body).to_string()
    }

    #[tokio::test]
    async fn lists_configured_agents() {
        let app = v1_router(test_api_state(10));
        let req = Request::builder().uri("/agents").body(Body::empty()).unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: AgentListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.agents.len(), 2);
        let helpdesk = json.agents.iter().find(|a| a.key == "helpdesk").unwrap();
        assert_eq!(helpdesk.kind, AgentKind::Bedrock);
        assert_eq!(helpdesk.instructions, "Answers support questions");
    }

    #[tokio::test]
    async fn direct_chat_streams_and_stores_answer() {
        let app = v1_router(test_api_state(10));
        let session = create_session(&app).await;

        let response = app.clone().oneshot(submit(&session.session_id, "Hi", "helpdesk")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let events = drain_events(&app, &session.session_id).await;
        assert!(events.contains("event: fragment"));
        assert!(events.contains("event: done"));
        assert!(!events.contains("event: error"));

        let req = Request::builder()
            .uri(format!("/sessions/{}", session.session_id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let snapshot: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot["messages"][0]["content"], "Hi");
        assert_eq!(snapshot["messages"][1]["content"], "Hello");
        assert_eq!(snapshot["processing"], false);
    }

    #[tokio::test]
    async fn tool_agent_answer_is_stored() {
        let app = v1_router(test_api_state(10));
        let session = create_session(&app).await;

        let response = app.clone().oneshot(submit(&session.session_id, "List files", "files")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let events = drain_events(&app, &session.session_id).await;
        assert!(events.contains("from tools"));
    }

    #[tokio::test]
    async fn submission_errors_map_to_statuses() {
        let app = v1_router(test_api_state(10));
        let session = create_session(&app).await;

        let response = app.clone().oneshot(submit(&session.session_id, "   ", "helpdesk")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.clone().oneshot(submit(&session.session_id, "Hi", "nobody")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.clone().oneshot(submit("missing", "Hi", "helpdesk")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn busy_session_returns_conflict() {
        let app = v1_router(test_api_state(10));
        let session = create_session(&app).await;

        let first = app.clone().oneshot(submit(&session.session_id, "one", "helpdesk")).await.unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app.clone().oneshot(submit(&session.session_id, "two", "helpdesk")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        drain_events(&app, &session.session_id).await;
    }

    #[tokio::test]
    async fn oldest_session_is_evicted_at_capacity() {
        let state = test_api_state(2);
        let app = v1_router(state.clone());

        let first = create_session(&app).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        create_session(&app).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        create_session(&app).await;

        assert_eq!(state.session_count().await, 2);
        let req = Request::builder()
            .uri(format!("/sessions/{}", first.session_id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
