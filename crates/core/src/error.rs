//! Error types for the AgentChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all AgentChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Agent / alias lookup ---
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    // --- Remote model / agent transport ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Tool session lifecycle ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A submission arrived while another one was still in flight.
    #[error("A response is already being generated for this session")]
    Busy,

    #[error("Timed out after {secs}s waiting for the agent")]
    Timeout { secs: u64 },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller can fix this by changing the input and retrying.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Prompt is {len} characters, the maximum is {max}")]
    PromptTooLong { len: usize, max: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Unknown agent profile: {0}")]
    UnknownProfile(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No agent matching '{0}' was found")]
    AgentNotFound(String),

    #[error("No alias matching '{alias}' was found for agent {agent_id}")]
    AliasNotFound { agent_id: String, alias: String },
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Failed to spawn tool server '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("Tool server handshake failed: {0}")]
    InitFailed(String),

    #[error("Tool server transport error: {0}")]
    Transport(String),

    #[error("Tool server returned error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("Tool session is closed")]
    Closed,

    #[error("Tool session teardown failed: {0}")]
    TeardownFailed(String),
}
