//! Shared scripted stand-ins for the remote boundaries.

use agentchat_core::error::{ProviderError, SessionError};
use agentchat_core::provider::{
    AgentInvocation, AgentRuntime, AgentSummary, ContentBlock, EventFrame, FrameStream,
    ModelClient, ModelRequest, ModelResponse,
};
use agentchat_core::tool::{SessionLauncher, SessionSpec, ToolCatalog, ToolDescriptor, ToolSession};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: Some("end_turn".into()),
    }
}

pub fn tool_response(id: &str, name: &str, input: serde_json::Value) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }],
        stop_reason: Some("tool_use".into()),
    }
}

/// Returns scripted responses in order and records every request.
/// Once the script runs out, the last entry repeats.
pub struct ScriptedModel {
    script: Vec<Result<ModelResponse, ProviderError>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        assert!(!script.is_empty());
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(responses: Vec<ModelResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.script.len() - 1);
        requests.push(request);
        self.script[index].clone()
    }
}

/// Counters shared between a launcher and the sessions it hands out.
#[derive(Default)]
pub struct SpyRecord {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub executions: Mutex<Vec<(String, serde_json::Value)>>,
}

impl SpyRecord {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> Vec<(String, serde_json::Value)> {
        self.executions.lock().unwrap().clone()
    }
}

pub struct SpySession {
    record: Arc<SpyRecord>,
    catalog: ToolCatalog,
    fail_close: bool,
}

#[async_trait]
impl ToolSession for SpySession {
    async fn discover(&self) -> agentchat_core::Result<ToolCatalog> {
        Ok(self.catalog.clone())
    }

    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
        self.record
            .executions
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if name == "explode" {
            return "Error: tool blew up".into();
        }
        format!("{name} -> {arguments}")
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.record.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(SessionError::TeardownFailed("stuck".into()));
        }
        Ok(())
    }
}

/// Hands out [`SpySession`]s offering the given tool names.
pub struct SpyLauncher {
    pub record: Arc<SpyRecord>,
    tools: Vec<String>,
    fail_close: bool,
}

impl SpyLauncher {
    pub fn new(tools: &[&str]) -> Self {
        Self {
            record: Arc::new(SpyRecord::default()),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            fail_close: false,
        }
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl SessionLauncher for SpyLauncher {
    async fn launch(&self, _spec: &SessionSpec) -> agentchat_core::Result<Box<dyn ToolSession>> {
        self.record.launches.fetch_add(1, Ordering::SeqCst);
        let catalog = self
            .tools
            .iter()
            .map(|name| ToolDescriptor {
                name: name.clone(),
                description: format!("{name} tool"),
                input_schema: serde_json::json!({"type": "object"}),
            })
            .collect();
        Ok(Box::new(SpySession {
            record: self.record.clone(),
            catalog,
            fail_close: self.fail_close,
        }))
    }
}

/// A fixed agent directory that streams a scripted list of frames.
pub struct StubRuntime {
    pub agents: Vec<AgentSummary>,
    pub aliases: Vec<AgentSummary>,
    pub frames: Vec<Result<EventFrame, ProviderError>>,
    pub invocations: Mutex<Vec<AgentInvocation>>,
}

impl StubRuntime {
    pub fn streaming(chunks: &[&str]) -> Self {
        Self {
            agents: vec![
                AgentSummary {
                    id: "AGT-OTHER".into(),
                    name: "billing-bot".into(),
                },
                AgentSummary {
                    id: "AGT-1".into(),
                    name: "Customer-Support-Agent".into(),
                },
                AgentSummary {
                    id: "AGT-2".into(),
                    name: "support-agent-v2".into(),
                },
            ],
            aliases: vec![
                AgentSummary {
                    id: "TSTALIAS".into(),
                    name: "AgentTestAlias".into(),
                },
                AgentSummary {
                    id: "ALIAS-1".into(),
                    name: "prod-latest".into(),
                },
            ],
            frames: chunks
                .iter()
                .map(|c| Ok(EventFrame::with_payload(c.as_bytes().to_vec())))
                .collect(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<AgentInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRuntime for StubRuntime {
    fn name(&self) -> &str {
        "stub"
    }

    async fn list_agents(&self) -> Result<Vec<AgentSummary>, ProviderError> {
        Ok(self.agents.clone())
    }

    async fn list_aliases(&self, _agent_id: &str) -> Result<Vec<AgentSummary>, ProviderError> {
        Ok(self.aliases.clone())
    }

    async fn invoke(&self, invocation: AgentInvocation) -> Result<FrameStream, ProviderError> {
        self.invocations.lock().unwrap().push(invocation);
        Ok(futures::stream::iter(self.frames.clone()).boxed())
    }
}
