//! Amazon Bedrock backends.
//!
//! - [`BedrockAgentRuntime`]: agent discovery (`ListAgents`, `ListAgentAliases`)
//!   and streaming `InvokeAgent`
//! - [`BedrockModelClient`]: `InvokeModel` with a Messages-API body
//!
//! Credentials come from the default AWS provider chain.

use agentchat_core::error::ProviderError;
use agentchat_core::provider::{
    AgentInvocation, AgentRuntime, AgentSummary, EventFrame, FrameStream, ModelClient,
    ModelRequest, ModelResponse,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_bedrockagent::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockagentruntime::types::{ResponseStream, StreamingConfigurations};
use aws_sdk_bedrockruntime::primitives::Blob;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

use crate::wire;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Load shared AWS configuration with a generous read timeout.
pub async fn load_sdk_config(region: Option<&str>, read_timeout: Duration) -> aws_config::SdkConfig {
    let timeouts = TimeoutConfig::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .build();

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

/// Flatten an SDK error into our transport error, keeping the source chain.
fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> ProviderError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{operation}: {}", DisplayErrorContext(&err));
    match err {
        SdkError::ServiceError(_) => ProviderError::Service(message),
        SdkError::ResponseError(_) => ProviderError::InvalidResponse(message),
        _ => ProviderError::Network(message),
    }
}

/// Managed agents: discovery plus streaming invocation.
pub struct BedrockAgentRuntime {
    agents: aws_sdk_bedrockagent::Client,
    runtime: aws_sdk_bedrockagentruntime::Client,
}

impl BedrockAgentRuntime {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            agents: aws_sdk_bedrockagent::Client::new(sdk_config),
            runtime: aws_sdk_bedrockagentruntime::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgentRuntime {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn list_agents(&self) -> Result<Vec<AgentSummary>, ProviderError> {
        let mut agents = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .agents
                .list_agents()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListAgents", e))?;

            agents.extend(page.agent_summaries().iter().map(|s| AgentSummary {
                id: s.agent_id().to_string(),
                name: s.agent_name().to_string(),
            }));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = agents.len(), "Listed Bedrock agents");
        Ok(agents)
    }

    async fn list_aliases(&self, agent_id: &str) -> Result<Vec<AgentSummary>, ProviderError> {
        let mut aliases = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .agents
                .list_agent_aliases()
                .agent_id(agent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListAgentAliases", e))?;

            aliases.extend(page.agent_alias_summaries().iter().map(|s| AgentSummary {
                id: s.agent_alias_id().to_string(),
                name: s.agent_alias_name().to_string(),
            }));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(agent_id, count = aliases.len(), "Listed Bedrock agent aliases");
        Ok(aliases)
    }

    async fn invoke(&self, invocation: AgentInvocation) -> Result<FrameStream, ProviderError> {
        info!(
            agent_id = %invocation.agent_id,
            alias_id = %invocation.alias_id,
            session_id = %invocation.session_id,
            "Invoking Bedrock agent"
        );

        let streaming = StreamingConfigurations::builder()
            .stream_final_response(invocation.stream_final_response)
            .build();

        let output = self
            .runtime
            .invoke_agent()
            .agent_id(invocation.agent_id)
            .agent_alias_id(invocation.alias_id)
            .session_id(invocation.session_id)
            .input_text(invocation.input_text)
            .enable_trace(invocation.enable_trace)
            .end_session(invocation.end_session)
            .streaming_configurations(streaming)
            .send()
            .await
            .map_err(|e| sdk_error("InvokeAgent", e))?;

        // Frames are pulled from the event receiver one at a time as the
        // consumer polls; nothing is buffered here.
        let frames = futures::stream::unfold(Some(output.completion), |receiver| async move {
            let mut receiver = receiver?;
            match receiver.recv().await {
                Ok(Some(event)) => Some((Ok(frame_from_event(event)), Some(receiver))),
                Ok(None) => None,
                Err(e) => Some((
                    Err(ProviderError::StreamInterrupted(
                        DisplayErrorContext(&e).to_string(),
                    )),
                    None,
                )),
            }
        });

        Ok(frames.boxed())
    }
}

fn frame_from_event(event: ResponseStream) -> EventFrame {
    match event {
        ResponseStream::Chunk(part) => EventFrame {
            payload: part.bytes().map(|blob| blob.as_ref().to_vec()),
        },
        // Trace, return-control and file events carry no text.
        _ => EventFrame::default(),
    }
}

/// Claude on Bedrock via `InvokeModel`.
pub struct BedrockModelClient {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockModelClient {
    pub fn new(sdk_config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(sdk_config),
            model_id: model_id.into(),
        }
    }

    fn body(request: &ModelRequest) -> Result<Vec<u8>, ProviderError> {
        let body = wire::request_body(
            request,
            &[("anthropic_version", serde_json::json!(BEDROCK_ANTHROPIC_VERSION))],
        );
        serde_json::to_vec(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for BedrockModelClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let body = Self::body(&request)?;

        debug!(provider = "bedrock", model = %self.model_id, max_tokens = request.max_tokens, "Sending model request");

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| sdk_error("InvokeModel", e))?;

        wire::parse_response(output.body().as_ref())
    }
}
