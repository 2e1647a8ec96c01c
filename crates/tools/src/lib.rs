//! MCP tool sessions for AgentChat.
//!
//! Tools live in an external server process spoken to over stdio with
//! JSON-RPC. [`McpLauncher`] implements
//! [`SessionLauncher`](agentchat_core::SessionLauncher) and produces
//! [`McpSession`]s, one per top-level request.

pub mod protocol;
pub mod session;
pub mod transport;

pub use session::{EMPTY_RESULT_TEXT, McpLauncher, McpSession};
