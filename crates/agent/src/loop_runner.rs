//! The agentic tool loop.
//!
//! One request runs as:
//!
//! 1. **Start** a tool session and discover its tools
//! 2. **Query** the model with the running context and tool definitions
//! 3. **If tool calls**: execute each, append the assistant turn and a user
//!    turn holding every result, loop back to step 2
//! 4. **If text only**: that text is the answer
//!
//! The loop makes at most `max_iterations` model calls. The tool session is
//! closed exactly once after every run, whatever the outcome.

use agentchat_core::error::Result;
use agentchat_core::message::Role;
use agentchat_core::provider::{
    ContentBlock, ModelClient, ModelRequest, ModelResponse, ToolChoice, TurnMessage,
};
use agentchat_core::tool::{SessionLauncher, SessionSpec, ToolCall, ToolResult, ToolSession};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer returned when the iteration bound is hit.
pub const MAX_ITERATIONS_SENTINEL: &str = "Maximum iterations reached.";

/// Answer returned when a turn after tool use has neither tools nor text.
pub const TASK_COMPLETED_SENTINEL: &str = "Task completed successfully using MCP tools.";

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Uninitialized,
    SessionReady,
    Querying,
    ToolDispatch,
    Done,
    MaxIterationsReached,
    Failed,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::MaxIterationsReached | Self::Failed)
    }
}

/// The result of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopOutcome {
    pub answer: String,
    /// Model round-trips made
    pub iterations: u32,
    /// Every tool result fed back to the model, in order
    pub tool_results: Vec<ToolResult>,
    pub state: LoopState,
}

/// Drives model ↔ tool turns for one request at a time.
pub struct AgenticLoop {
    model: Arc<dyn ModelClient>,
    launcher: Arc<dyn SessionLauncher>,
    max_iterations: u32,
    initial_max_tokens: u32,
    followup_max_tokens: u32,
}

impl AgenticLoop {
    pub fn new(model: Arc<dyn ModelClient>, launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            model,
            launcher,
            max_iterations: 10,
            initial_max_tokens: 1000,
            followup_max_tokens: 2000,
        }
    }

    /// Set the maximum number of model round-trips per request.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Output budgets for the first model call and for calls after tool use.
    pub fn with_token_budgets(mut self, initial: u32, followup: u32) -> Self {
        self.initial_max_tokens = initial;
        self.followup_max_tokens = followup;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run one request in its own tool session.
    ///
    /// A model or discovery failure is returned as an error (the `Failed`
    /// state). Teardown errors are logged and never replace the result.
    pub async fn run(&self, spec: &SessionSpec, prompt: &str) -> Result<LoopOutcome> {
        let session = self.launcher.launch(spec).await?;

        let result = self.drive(session.as_ref(), &spec.system_prompt, prompt).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Tool session teardown failed");
        }

        match &result {
            Ok(outcome) => info!(
                state = ?outcome.state,
                iterations = outcome.iterations,
                tool_calls = outcome.tool_results.len(),
                "Agentic run finished"
            ),
            Err(e) => warn!(state = ?LoopState::Failed, error = %e, "Agentic run failed"),
        }
        result
    }

    async fn drive(&self, session: &dyn ToolSession, system: &str, prompt: &str) -> Result<LoopOutcome> {
        let mut state = LoopState::Uninitialized;
        let tools = session.discover().await?.definitions();
        transition(&mut state, LoopState::SessionReady);

        let mut messages = vec![TurnMessage::user_text(prompt)];
        let mut tool_results = Vec::new();

        for iteration in 1..=self.max_iterations {
            transition(&mut state, LoopState::Querying);
            let max_tokens = if iteration == 1 {
                self.initial_max_tokens
            } else {
                self.followup_max_tokens
            };

            let response = self
                .model
                .invoke(ModelRequest {
                    system: system.to_string(),
                    messages: messages.clone(),
                    max_tokens,
                    tools: tools.clone(),
                    tool_choice: ToolChoice::Auto,
                })
                .await?;

            let calls = tool_calls(&response);
            if calls.is_empty() {
                transition(&mut state, LoopState::Done);
                let text = response.text();
                let answer = if text.trim().is_empty() && iteration > 1 {
                    TASK_COMPLETED_SENTINEL.to_string()
                } else {
                    text
                };
                return Ok(LoopOutcome {
                    answer,
                    iterations: iteration,
                    tool_results,
                    state,
                });
            }

            // Results of a final-iteration dispatch would never reach the model.
            if iteration == self.max_iterations {
                break;
            }

            transition(&mut state, LoopState::ToolDispatch);
            debug!(iteration, tool_count = calls.len(), "Executing tool calls");

            let mut result_blocks = Vec::with_capacity(calls.len());
            for call in &calls {
                let output = session.execute(&call.name, call.arguments.clone()).await;
                let result = ToolResult::for_call(call, output);
                result_blocks.push(ContentBlock::tool_result(&result.call_id, &result.output));
                tool_results.push(result);
            }

            messages.push(TurnMessage {
                role: Role::Assistant,
                content: response.content,
            });
            messages.push(TurnMessage {
                role: Role::User,
                content: result_blocks,
            });
        }

        transition(&mut state, LoopState::MaxIterationsReached);
        warn!(max_iterations = self.max_iterations, "Iteration bound reached");
        Ok(LoopOutcome {
            answer: MAX_ITERATIONS_SENTINEL.to_string(),
            iterations: self.max_iterations,
            tool_results,
            state,
        })
    }
}

fn transition(state: &mut LoopState, next: LoopState) {
    debug!(from = ?state, to = ?next, "Loop state");
    *state = next;
}

/// Tool-use blocks of a response, in order.
fn tool_calls(response: &ModelResponse) -> Vec<ToolCall> {
    response
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: input.clone(),
            }),
            _ => None,
        })
        .collect()
}
