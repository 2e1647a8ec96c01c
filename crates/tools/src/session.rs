//! MCP tool sessions: spawn a stdio server, handshake, discover, call, close.

use agentchat_core::error::{Result, SessionError, ToolError};
use agentchat_core::tool::{
    SessionLauncher, SessionSpec, TOOL_ERROR_PREFIX, ToolCatalog, ToolDescriptor, ToolSession,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::protocol::{CallToolResult, InitializeResult, ListToolsResult, PROTOCOL_VERSION};
use crate::transport::StdioTransport;

/// Time allowed for the `initialize` handshake (interpreters can be slow to start).
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the server to exit after stdin closes before it is killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Returned when a tool produced no text content.
pub const EMPTY_RESULT_TEXT: &str = "Tool executed successfully";

/// Starts [`McpSession`]s.
#[derive(Debug, Clone)]
pub struct McpLauncher {
    call_timeout: Duration,
}

impl McpLauncher {
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound each `tools/call` round-trip.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

impl Default for McpLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionLauncher for McpLauncher {
    async fn launch(&self, spec: &SessionSpec) -> Result<Box<dyn ToolSession>> {
        let session = McpSession::start(spec, self.call_timeout).await?;
        Ok(Box::new(session))
    }
}

/// A live connection to one MCP server process.
pub struct McpSession {
    server: String,
    transport: StdioTransport,
    child: Mutex<Option<Child>>,
    catalog: OnceCell<ToolCatalog>,
    call_timeout: Duration,
    closed: AtomicBool,
}

impl McpSession {
    /// Validate the spec, spawn the server, and complete the handshake.
    pub async fn start(spec: &SessionSpec, call_timeout: Duration) -> Result<Self> {
        spec.validate()?;

        let server = spec
            .scripts
            .first()
            .and_then(|s| s.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| spec.command.display().to_string());

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.scripts)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| SessionError::SpawnFailed {
            command: spec.command.display().to_string(),
            reason: e.to_string(),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| SessionError::SpawnFailed {
            command: spec.command.display().to_string(),
            reason: "failed to capture stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SessionError::SpawnFailed {
            command: spec.command.display().to_string(),
            reason: "failed to capture stdout".into(),
        })?;
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(server.clone(), stderr);
        }

        let session = Self {
            transport: StdioTransport::new(server.clone(), stdin, stdout),
            child: Mutex::new(Some(child)),
            catalog: OnceCell::new(),
            call_timeout,
            closed: AtomicBool::new(false),
            server,
        };

        if let Err(e) = session.initialize().await {
            // The child must not outlive a failed handshake.
            if let Err(close_err) = session.close().await {
                warn!(server = %session.server, error = %close_err, "Cleanup after failed handshake");
            }
            return Err(e.into());
        }

        Ok(session)
    }

    async fn initialize(&self) -> std::result::Result<(), SessionError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "agentchat",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let result = tokio::time::timeout(INIT_TIMEOUT, self.transport.request("initialize", Some(params)))
            .await
            .map_err(|_| SessionError::InitFailed(format!("no response within {}s", INIT_TIMEOUT.as_secs())))?
            .map_err(|e| SessionError::InitFailed(e.to_string()))?;

        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| SessionError::InitFailed(format!("bad initialize result: {e}")))?;

        self.transport.notify("notifications/initialized", None).await?;

        info!(
            server = %self.server,
            server_name = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            protocol = init.protocol_version.as_deref().unwrap_or(PROTOCOL_VERSION),
            "Tool session initialized"
        );
        Ok(())
    }

    async fn fetch_catalog(&self) -> Result<ToolCatalog> {
        let mut catalog = ToolCatalog::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };
            let value = self.transport.request("tools/list", Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(value)?;

            for tool in page.tools {
                catalog.insert(ToolDescriptor::from(tool));
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(server = %self.server, tools = catalog.len(), "Discovered tools");
        Ok(catalog)
    }

    async fn call(&self, name: &str, arguments: serde_json::Value) -> std::result::Result<String, ToolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: SessionError::Closed.to_string(),
            });
        }
        if let Some(catalog) = self.catalog.get() {
            if !catalog.contains(name) {
                return Err(ToolError::NotFound(name.to_string()));
            }
        }

        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let value = tokio::time::timeout(self.call_timeout, self.transport.request("tools/call", Some(params)))
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: self.call_timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: e.to_string(),
            })?;

        let result: CallToolResult = serde_json::from_value(value).map_err(|e| ToolError::ExecutionFailed {
            tool_name: name.to_string(),
            reason: format!("bad tools/call result: {e}"),
        })?;

        let text = result.joined_text();
        if result.is_error {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: text.unwrap_or_else(|| "tool reported an error".into()),
            });
        }
        Ok(text.unwrap_or_else(|| EMPTY_RESULT_TEXT.to_string()))
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn discover(&self) -> Result<ToolCatalog> {
        self.catalog
            .get_or_try_init(|| self.fetch_catalog())
            .await
            .cloned()
    }

    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
        debug!(server = %self.server, tool = name, "Calling tool");
        match self.call(name, arguments).await {
            Ok(text) => text,
            Err(e) => {
                warn!(server = %self.server, tool = name, error = %e, "Tool call failed");
                format!("{TOOL_ERROR_PREFIX}{e}")
            }
        }
    }

    async fn close(&self) -> std::result::Result<(), SessionError> {
        self.closed.store(true, Ordering::Release);
        self.transport.close_stdin().await;

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(server = %self.server, %status, "Tool server exited");
                Ok(())
            }
            _ => {
                warn!(server = %self.server, "Tool server did not exit, killing");
                child
                    .kill()
                    .await
                    .map_err(|e| SessionError::TeardownFailed(format!("{}: {e}", self.server)))
            }
        }
    }
}

/// Forward the server's stderr into the debug log until it closes.
fn spawn_stderr_drain(server: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(server = %server, "{line}");
        }
    });
}
