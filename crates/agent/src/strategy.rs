//! Invocation strategies: the closed set of ways a prompt can be answered,
//! and the registry that maps configured profiles onto them.

use agentchat_config::{AgentKind, AgentProfile, AppConfig};
use agentchat_core::error::{Result, ValidationError};
use agentchat_core::fragment::{FragmentSender, StreamFragment};
use agentchat_core::provider::{AgentRuntime, ModelClient};
use agentchat_core::tool::{SessionLauncher, SessionSpec};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::direct::{DirectInvoker, DirectTarget};
use crate::executor::TaskPool;
use crate::loop_runner::AgenticLoop;

/// Per-request context handed to a strategy by the coordinator's worker.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub user_id: String,
    pub session_id: String,
    pub fragments: FragmentSender,
}

impl InvocationContext {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>, fragments: FragmentSender) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            fragments,
        }
    }
}

/// How one request is answered. Selected once per submission.
#[derive(Clone)]
pub enum InvocationStrategy {
    /// Stream from a managed agent.
    Direct {
        invoker: Arc<DirectInvoker>,
        target: DirectTarget,
    },
    /// Run the tool loop on the task pool.
    Agentic {
        runner: Arc<AgenticLoop>,
        pool: Arc<TaskPool>,
        spec: SessionSpec,
    },
}

impl std::fmt::Debug for InvocationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { target, .. } => f.debug_struct("Direct").field("target", target).finish(),
            Self::Agentic { spec, .. } => f.debug_struct("Agentic").field("command", &spec.command).finish(),
        }
    }
}

impl InvocationStrategy {
    pub fn kind(&self) -> AgentKind {
        match self {
            Self::Direct { .. } => AgentKind::Bedrock,
            Self::Agentic { .. } => AgentKind::Mcp,
        }
    }

    /// Checks that must pass before anything is stored or started.
    pub fn preflight(&self) -> Result<()> {
        match self {
            Self::Direct { target, .. } if target.agent_name.trim().is_empty() => {
                Err(ValidationError::MissingField("agent_name".into()).into())
            }
            Self::Direct { .. } => Ok(()),
            Self::Agentic { spec, .. } => spec.validate(),
        }
    }

    /// Whether the previous assistant reply should be prepended to the prompt.
    /// Tool sessions start fresh each request, so they need it; managed agents
    /// keep their own session memory.
    pub fn carries_context(&self) -> bool {
        matches!(self, Self::Agentic { .. })
    }

    /// Answer `prompt`, pushing fragments to `ctx.fragments`.
    ///
    /// On success the concatenation of pushed fragments equals the returned text.
    pub async fn invoke(&self, prompt: &str, ctx: &InvocationContext) -> Result<String> {
        match self {
            Self::Direct { invoker, target } => invoker.invoke(target, prompt, ctx).await,
            Self::Agentic { runner, pool, spec } => {
                let runner = runner.clone();
                let spec = spec.clone();
                let prompt = prompt.to_string();
                let outcome = pool.run(async move { runner.run(&spec, &prompt).await }).await?;

                if !outcome.answer.is_empty() {
                    ctx.fragments
                        .send(StreamFragment::text(&ctx.user_id, outcome.answer.clone()))
                        .await?;
                }
                Ok(outcome.answer)
            }
        }
    }
}

/// Configured agent profiles and the shared machinery behind them.
pub struct AgentRegistry {
    profiles: BTreeMap<String, AgentProfile>,
    direct: Arc<DirectInvoker>,
    agentic: Arc<AgenticLoop>,
    pool: Arc<TaskPool>,
}

impl AgentRegistry {
    pub fn new(
        profiles: BTreeMap<String, AgentProfile>,
        direct: Arc<DirectInvoker>,
        agentic: Arc<AgenticLoop>,
        pool: Arc<TaskPool>,
    ) -> Self {
        Self {
            profiles,
            direct,
            agentic,
            pool,
        }
    }

    /// Wire the registry from configuration and backends.
    pub fn from_config(
        config: &AppConfig,
        agents: Arc<dyn AgentRuntime>,
        model: Arc<dyn ModelClient>,
        launcher: Arc<dyn SessionLauncher>,
    ) -> Result<Self> {
        let agentic = AgenticLoop::new(model, launcher)
            .with_max_iterations(config.agentic.max_iterations)
            .with_token_budgets(config.agentic.initial_max_tokens, config.agentic.followup_max_tokens);
        let pool = TaskPool::new(config.agentic.worker_threads, config.agentic.timeout())?;

        Ok(Self::new(
            config.agents.clone(),
            Arc::new(DirectInvoker::new(agents)),
            Arc::new(agentic),
            Arc::new(pool),
        ))
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&str, &AgentProfile)> {
        self.profiles.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn profile(&self, key: &str) -> Option<&AgentProfile> {
        self.profiles.get(key)
    }

    pub fn direct(&self) -> &Arc<DirectInvoker> {
        &self.direct
    }

    /// The strategy for a profile key.
    pub fn strategy(&self, key: &str) -> Result<InvocationStrategy> {
        let profile = self
            .profiles
            .get(key)
            .ok_or_else(|| ValidationError::UnknownProfile(key.to_string()))?;

        Ok(match profile.kind {
            AgentKind::Bedrock => InvocationStrategy::Direct {
                invoker: self.direct.clone(),
                target: DirectTarget {
                    agent_name: profile.agent_name_or(key).to_string(),
                    alias: profile.alias.clone(),
                },
            },
            AgentKind::Mcp => InvocationStrategy::Agentic {
                runner: self.agentic.clone(),
                pool: self.pool.clone(),
                spec: profile.session_spec(),
            },
        })
    }
}
