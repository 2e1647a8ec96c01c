//! # AgentChat Core
//!
//! Domain types, boundary traits, and error definitions for the AgentChat
//! runtime. This crate has **no transport dependencies**: it defines the model
//! that the provider, tool, agent, and gateway crates implement against.
//!
//! ## Boundaries
//!
//! - [`ModelClient`]: the model driving the agentic tool loop
//! - [`AgentRuntime`]: the managed agent service used for direct streaming
//! - [`ToolSession`] / [`SessionLauncher`]: the external tool process
//!
//! Tests swap these for scripted stand-ins.

pub mod error;
pub mod fragment;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, ProviderError, ResolutionError, Result, SessionError, ToolError, ValidationError,
};
pub use fragment::{FragmentReceiver, FragmentSender, StreamFragment, fragment_queue};
pub use message::{ConversationStore, Message, Role};
pub use provider::{
    AgentInvocation, AgentRuntime, AgentSummary, ContentBlock, EventFrame, FrameStream,
    ModelClient, ModelRequest, ModelResponse, ToolChoice, ToolDefinition, TurnMessage,
};
pub use tool::{
    SessionLauncher, SessionSpec, TOOL_ERROR_PREFIX, ToolCall, ToolCatalog, ToolDescriptor,
    ToolResult, ToolSession,
};
