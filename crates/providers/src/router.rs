//! Backend router: builds the model client and agent runtime from config.

use agentchat_config::{AppConfig, ModelBackend};
use agentchat_core::error::ProviderError;
use agentchat_core::provider::{AgentRuntime, ModelClient};
use std::sync::Arc;
use tracing::info;

use crate::anthropic::AnthropicModelClient;
use crate::bedrock::{BedrockAgentRuntime, BedrockModelClient, load_sdk_config};

/// The remote services the agent layer talks to.
#[derive(Clone)]
pub struct Backends {
    pub model: Arc<dyn ModelClient>,
    pub agents: Arc<dyn AgentRuntime>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("model", &self.model.name())
            .field("agents", &self.agents.name())
            .finish()
    }
}

/// Build backends from configuration.
///
/// Direct agents always go through Bedrock; the model behind the tool loop
/// is selected by `model.backend`.
pub async fn build_from_config(config: &AppConfig) -> Result<Backends, ProviderError> {
    let sdk_config = load_sdk_config(config.aws.region.as_deref(), config.aws.read_timeout()).await;
    let agents: Arc<dyn AgentRuntime> = Arc::new(BedrockAgentRuntime::new(&sdk_config));

    let model: Arc<dyn ModelClient> = match config.model.backend {
        ModelBackend::Bedrock => Arc::new(BedrockModelClient::new(&sdk_config, &config.model.model_id)),
        ModelBackend::Anthropic => {
            let api_key = config.model.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("model.api_key (or ANTHROPIC_API_KEY) is required".into())
            })?;
            let mut client =
                AnthropicModelClient::new(api_key, &config.model.model_id, config.aws.read_timeout())?;
            if let Some(url) = &config.model.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
    };

    info!(model_backend = model.name(), model_id = %config.model.model_id, "Backends ready");
    Ok(Backends { model, agents })
}
