//! Remote backends for AgentChat.
//!
//! Implements the `agentchat_core` [`ModelClient`](agentchat_core::ModelClient)
//! and [`AgentRuntime`](agentchat_core::AgentRuntime) traits. The router
//! builds the configured set.

pub mod anthropic;
pub mod bedrock;
pub mod router;
mod wire;

pub use anthropic::AnthropicModelClient;
pub use bedrock::{BedrockAgentRuntime, BedrockModelClient};
pub use router::{Backends, build_from_config};
