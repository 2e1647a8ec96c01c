//! Messages-API wire format shared by the Bedrock and Anthropic model clients.
//!
//! Both backends accept the same request body apart from how the API version
//! and model are named, and both answer with the same content-block shape.

use agentchat_core::error::ProviderError;
use agentchat_core::provider::{ContentBlock, ModelRequest, ModelResponse};
use serde::Deserialize;

/// Build the JSON request body. `extra` fields (model name, API version)
/// are merged in at the top level.
pub(crate) fn request_body(
    request: &ModelRequest,
    extra: &[(&str, serde_json::Value)],
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "max_tokens": request.max_tokens,
        "messages": request.messages,
    });

    if !request.system.is_empty() {
        body["system"] = serde_json::json!(request.system);
    }

    if !request.tools.is_empty() {
        body["tools"] = serde_json::json!(request.tools);
        body["tool_choice"] = serde_json::json!(request.tool_choice);
    }

    for (key, value) in extra {
        body[*key] = value.clone();
    }

    body
}

/// Parse a Messages-API response body, ignoring block types we don't use.
pub(crate) fn parse_response(bytes: &[u8]) -> Result<ModelResponse, ProviderError> {
    let wire: WireResponse = serde_json::from_slice(bytes)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse model response: {e}")))?;

    let content = wire
        .content
        .into_iter()
        .filter_map(|block| match block {
            WireBlock::Text { text } => Some(ContentBlock::Text { text }),
            WireBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                id,
                name,
                // Echoed back verbatim next turn, where the API requires an object.
                input: input
                    .filter(|v| !v.is_null())
                    .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            }),
            WireBlock::Other => None,
        })
        .collect();

    Ok(ModelResponse {
        content,
        stop_reason: wire.stop_reason,
    })
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    content: Vec<WireBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_core::provider::{ToolChoice, ToolDefinition, TurnMessage};

    fn request(tools: Vec<ToolDefinition>) -> ModelRequest {
        ModelRequest {
            system: "You are helpful.".into(),
            messages: vec![TurnMessage::user_text("Hello")],
            max_tokens: 1000,
            tools,
            tool_choice: ToolChoice::Auto,
        }
    }

    #[test]
    fn body_without_tools_omits_tool_fields() {
        let body = request_body(&request(vec![]), &[]);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["system"], "You are helpful.");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], "Hello");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn body_with_tools_and_version() {
        let tools = vec![ToolDefinition {
            name: "lookup".into(),
            description: "Look something up".into(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        let body = request_body(
            &request(tools),
            &[("anthropic_version", serde_json::json!("bedrock-2023-05-31"))],
        );
        assert_eq!(body["tools"][0]["name"], "lookup");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["tool_choice"]["type"], "auto");
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
    }

    #[test]
    fn parse_mixed_blocks() {
        let raw = br#"{
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "tu_1", "name": "lookup", "input": {"q": "x"}}
            ],
            "stop_reason": "tool_use"
        }"#;
        let response = parse_response(raw).unwrap();
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.text(), "Checking.");
        assert!(response.has_tool_use());
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn tool_use_without_input_gets_an_empty_object() {
        let raw = br#"{
            "content": [
                {"type": "tool_use", "id": "tu_1", "name": "ping"},
                {"type": "tool_use", "id": "tu_2", "name": "ping", "input": null}
            ]
        }"#;
        let response = parse_response(raw).unwrap();
        for block in &response.content {
            match block {
                ContentBlock::ToolUse { input, .. } => assert_eq!(input, &serde_json::json!({})),
                other => panic!("unexpected block {other:?}"),
            }
        }

        let echoed = serde_json::to_value(&response.content[0]).unwrap();
        assert_eq!(echoed["input"], serde_json::json!({}));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_response(b"not json"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
