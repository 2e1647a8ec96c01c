//! Anthropic native Messages API model client.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use agentchat_core::error::ProviderError;
use agentchat_core::provider::{ModelClient, ModelRequest, ModelResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::wire;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Messages API client.
pub struct AnthropicModelClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicModelClient {
    /// Create a new client for `model`. Model calls can take minutes.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn body(&self, request: &ModelRequest) -> serde_json::Value {
        wire::request_body(request, &[("model", serde_json::json!(self.model))])
    }
}

#[async_trait]
impl ModelClient for AnthropicModelClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.body(&request);

        debug!(provider = "anthropic", model = %self.model, messages = request.messages.len(), "Sending model request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::StreamInterrupted(e.to_string()))?;

        wire::parse_response(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_core::provider::{ToolChoice, TurnMessage};

    fn client() -> AnthropicModelClient {
        AnthropicModelClient::new("sk-ant-test", "claude-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn constructor_defaults() {
        let c = client();
        assert_eq!(c.name(), "anthropic");
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = client().with_base_url("http://localhost:9999/");
        assert_eq!(c.base_url, "http://localhost:9999");
    }

    #[test]
    fn body_names_the_model() {
        let request = ModelRequest {
            system: String::new(),
            messages: vec![TurnMessage::user_text("hi")],
            max_tokens: 2000,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        };
        let body = client().body(&request);
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 2000);
        assert!(body.get("system").is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let c = client().with_base_url("http://127.0.0.1:9");
        let request = ModelRequest {
            system: String::new(),
            messages: vec![TurnMessage::user_text("hi")],
            max_tokens: 10,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        };
        let err = c.invoke(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
