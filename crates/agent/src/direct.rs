//! Direct agent invocation: resolve a managed agent by name, stream its reply.

use agentchat_core::error::{ResolutionError, Result};
use agentchat_core::fragment::StreamFragment;
use agentchat_core::provider::{AgentInvocation, AgentRuntime, AgentSummary};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::decoder::decode_frames;
use crate::strategy::InvocationContext;

/// Which remote agent and alias to call, as case-insensitive name fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectTarget {
    pub agent_name: String,
    pub alias: String,
}

/// Resolved identifiers for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAgent {
    pub agent_id: String,
    pub alias_id: String,
}

/// First entry whose name contains `fragment`, ignoring case.
pub fn find_by_name<'a>(entries: &'a [AgentSummary], fragment: &str) -> Option<&'a AgentSummary> {
    let needle = fragment.to_lowercase();
    entries.iter().find(|e| e.name.to_lowercase().contains(&needle))
}

pub struct DirectInvoker {
    runtime: Arc<dyn AgentRuntime>,
}

impl DirectInvoker {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<dyn AgentRuntime> {
        &self.runtime
    }

    /// Resolve agent and alias ids from the discovery listings.
    pub async fn resolve(&self, target: &DirectTarget) -> Result<ResolvedAgent> {
        let agents = self.runtime.list_agents().await?;
        let agent = find_by_name(&agents, &target.agent_name)
            .ok_or_else(|| ResolutionError::AgentNotFound(target.agent_name.clone()))?;

        let aliases = self.runtime.list_aliases(&agent.id).await?;
        let alias = find_by_name(&aliases, &target.alias).ok_or_else(|| ResolutionError::AliasNotFound {
            agent_id: agent.id.clone(),
            alias: target.alias.clone(),
        })?;

        debug!(agent = %agent.name, agent_id = %agent.id, alias = %alias.name, "Resolved agent");
        Ok(ResolvedAgent {
            agent_id: agent.id.clone(),
            alias_id: alias.id.clone(),
        })
    }

    /// Stream a reply, forwarding each fragment to the queue as it arrives.
    ///
    /// Returns the concatenation of the forwarded fragments. Any failure
    /// returns an error instead of a partial answer.
    pub async fn invoke(&self, target: &DirectTarget, prompt: &str, ctx: &InvocationContext) -> Result<String> {
        let resolved = self.resolve(target).await?;

        let frames = self
            .runtime
            .invoke(AgentInvocation {
                agent_id: resolved.agent_id,
                alias_id: resolved.alias_id,
                input_text: prompt.to_string(),
                session_id: ctx.session_id.clone(),
                enable_trace: false,
                end_session: false,
                stream_final_response: true,
            })
            .await?;

        let mut fragments = Box::pin(decode_frames(frames));
        let mut response = String::new();
        let mut count = 0usize;

        while let Some(fragment) = fragments.next().await {
            let text = fragment?;
            response.push_str(&text);
            count += 1;
            ctx.fragments
                .send(StreamFragment::text(&ctx.user_id, text))
                .await?;
        }

        info!(user_id = %ctx.user_id, fragments = count, chars = response.len(), "Agent response complete");
        Ok(response)
    }
}
