//! Remote boundaries: the model used by the agentic loop, and the managed
//! agent service used for direct streaming invocation.
//!
//! Implementations: Bedrock (agent runtime + model runtime), Anthropic
//! Messages API. Tests use scripted in-memory implementations.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Role;

// --- Model invocation ---

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's arguments
    pub input_schema: serde_json::Value,
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    #[default]
    Auto,
    /// The model must call some tool.
    Any,
}

/// One content block of a model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ContentBlock>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// A tool result carrying a single text block.
    pub fn tool_result(tool_use_id: impl Into<String>, output: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: vec![ContentBlock::text(output)],
        }
    }
}

/// A role-tagged turn in the running model context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl TurnMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// A single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<TurnMessage>,
    pub max_tokens: u32,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

/// The model's reply: ordered content blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl ModelResponse {
    /// All text blocks joined in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the model asked for at least one tool.
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

/// The model used by the agentic loop.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this backend (e.g., "bedrock", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response.
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError>;
}

// --- Managed agent service ---

/// A name/id pair returned by the discovery listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
}

/// A streaming invocation of a resolved agent alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocation {
    pub agent_id: String,
    pub alias_id: String,
    pub input_text: String,
    pub session_id: String,
    pub enable_trace: bool,
    pub end_session: bool,
    pub stream_final_response: bool,
}

/// One raw frame of the agent's event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFrame {
    /// Binary payload; absent on trace/metadata frames.
    pub payload: Option<Vec<u8>>,
}

impl EventFrame {
    pub fn with_payload(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Some(bytes.into()),
        }
    }
}

/// Lazy, finite sequence of frames from one invocation.
pub type FrameStream = BoxStream<'static, Result<EventFrame, ProviderError>>;

/// The managed agent-invocation service.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// List every agent visible to the caller.
    async fn list_agents(&self) -> Result<Vec<AgentSummary>, ProviderError>;

    /// List the aliases of one agent.
    async fn list_aliases(&self, agent_id: &str) -> Result<Vec<AgentSummary>, ProviderError>;

    /// Open a streaming call. Frames are produced as the service emits them.
    async fn invoke(&self, invocation: AgentInvocation) -> Result<FrameStream, ProviderError>;
}
