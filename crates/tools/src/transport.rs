//! Line-delimited JSON-RPC over a child process's stdin/stdout.
//!
//! One JSON object per line. Requests are answered in order; lines that are
//! not a response to the pending id (server logs, notifications) are skipped.

use agentchat_core::error::SessionError;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::trace;

use crate::protocol::{INTERNAL_ERROR, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub struct StdioTransport {
    server: String,
    next_id: AtomicU64,
    /// `None` once stdin has been closed for shutdown.
    writer: Mutex<Option<ChildStdin>>,
    reader: Mutex<BufReader<ChildStdout>>,
}

impl StdioTransport {
    pub fn new(server: impl Into<String>, stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            server: server.into(),
            next_id: AtomicU64::new(1),
            writer: Mutex::new(Some(stdin)),
            reader: Mutex::new(BufReader::new(stdout)),
        }
    }

    /// Send a request and wait for its result value.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let line = serde_json::to_string(&request)
            .map_err(|e| SessionError::Transport(format!("failed to serialize {method}: {e}")))?;

        // Hold the reader for the whole exchange so concurrent callers
        // can't steal each other's responses.
        let mut reader = self.reader.lock().await;
        self.write_line(line).await?;

        let mut buf = String::new();
        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .await
                .map_err(|e| SessionError::Transport(format!("failed to read from {}: {e}", self.server)))?;

            if read == 0 {
                return Err(SessionError::Transport(format!(
                    "{} closed stdout (process may have exited)",
                    self.server
                )));
            }

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(response) if response.id == Some(id) => return extract_result(response),
                _ => trace!(server = %self.server, line = trimmed, "Skipping non-matching line"),
            }
        }
    }

    /// Send a notification. No reply is read.
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method, params))
            .map_err(|e| SessionError::Transport(format!("failed to serialize {method}: {e}")))?;
        self.write_line(line).await
    }

    /// Close stdin so the server sees EOF. Later writes fail with `Closed`.
    pub async fn close_stdin(&self) {
        let mut writer = self.writer.lock().await;
        if let Some(mut stdin) = writer.take() {
            let _ = stdin.shutdown().await;
        }
    }

    async fn write_line(&self, mut line: String) -> Result<(), SessionError> {
        line.push('\n');
        let mut guard = self.writer.lock().await;
        let stdin = guard.as_mut().ok_or(SessionError::Closed)?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::Transport(format!("failed to write to {}: {e}", self.server)))?;
        stdin
            .flush()
            .await
            .map_err(|e| SessionError::Transport(format!("failed to flush {}: {e}", self.server)))
    }
}

/// Turn a response into its result, or the server's error.
pub fn extract_result(response: JsonRpcResponse) -> Result<serde_json::Value, SessionError> {
    if let Some(err) = response.error {
        return Err(SessionError::ServerError {
            code: err.code,
            message: err.message,
        });
    }
    response.result.ok_or(SessionError::ServerError {
        code: INTERNAL_ERROR,
        message: "response missing both result and error".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JsonRpcError;

    #[test]
    fn extract_result_success() {
        let response = JsonRpcResponse {
            id: Some(1),
            result: Some(serde_json::json!({"ok": true})),
            error: None,
        };
        assert_eq!(extract_result(response).unwrap()["ok"], true);
    }

    #[test]
    fn extract_result_server_error() {
        let response = JsonRpcResponse {
            id: Some(1),
            result: None,
            error: Some(JsonRpcError {
                code: -32601,
                message: "Method not found".into(),
            }),
        };
        assert!(matches!(
            extract_result(response),
            Err(SessionError::ServerError { code: -32601, .. })
        ));
    }

    #[test]
    fn extract_result_empty_response() {
        let response = JsonRpcResponse {
            id: Some(1),
            result: None,
            error: None,
        };
        assert!(matches!(
            extract_result(response),
            Err(SessionError::ServerError { code: INTERNAL_ERROR, .. })
        ));
    }
}
