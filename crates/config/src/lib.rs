//! Configuration loading, validation, and management for AgentChat.
//!
//! Loads configuration from `~/.agentchat/config.toml` (or the path in
//! `AGENTCHAT_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use agentchat_core::SessionSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// AWS client settings
    #[serde(default)]
    pub aws: AwsConfig,

    /// Model used by tool-driving agents
    #[serde(default)]
    pub model: ModelConfig,

    /// Submission and streaming limits
    #[serde(default)]
    pub chat: ChatConfig,

    /// Tool loop limits
    #[serde(default)]
    pub agentic: AgenticConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Selectable agent profiles, keyed by a short identifier
    #[serde(default)]
    pub agents: BTreeMap<String, AgentProfile>,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Responses can legitimately take minutes.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_read_timeout() -> u64 {
    1000
}

impl AwsConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// Which model API backs the tool loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Bedrock,
    Anthropic,
}

impl std::str::FromStr for ModelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bedrock" => Ok(ModelBackend::Bedrock),
            "anthropic" => Ok(ModelBackend::Anthropic),
            other => Err(ConfigError::ValidationError(format!(
                "unknown model backend '{other}' (expected bedrock or anthropic)"
            ))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Only used by the anthropic backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_model_id() -> String {
    "us.anthropic.claude-3-5-sonnet-20241022-v2:0".into()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("backend", &self.backend)
            .field("model_id", &self.model_id)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Per-user transcript cap (drop-oldest). Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Fragment queue capacity. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_max_prompt_chars() -> usize {
    1000
}
fn default_poll_interval() -> u64 {
    100
}

impl ChatConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            history_limit: None,
            queue_capacity: None,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgenticConfig {
    /// Upper bound on model round-trips per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_initial_max_tokens")]
    pub initial_max_tokens: u32,

    #[serde(default = "default_followup_max_tokens")]
    pub followup_max_tokens: u32,

    /// How long the caller waits on the task pool before giving up
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_initial_max_tokens() -> u32 {
    1000
}
fn default_followup_max_tokens() -> u32 {
    2000
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_worker_threads() -> usize {
    2
}
fn default_tool_timeout_secs() -> u64 {
    120
}

impl AgenticConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            initial_max_tokens: default_initial_max_tokens(),
            followup_max_tokens: default_followup_max_tokens(),
            timeout_secs: default_timeout_secs(),
            worker_threads: default_worker_threads(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_sessions: default_max_sessions(),
            cors: true,
        }
    }
}

/// How a profile is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Managed agent, streamed directly
    #[default]
    Bedrock,
    /// Local tool server driven by the agentic loop
    Mcp,
}

/// A selectable agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: AgentKind,

    /// Markdown shown next to the chat
    #[serde(default)]
    pub instructions: String,

    /// Fragment of the remote agent name (bedrock). Defaults to the profile key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    #[serde(default = "default_alias")]
    pub alias: String,

    /// Tool server executable (mcp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

fn default_alias() -> String {
    "latest".into()
}

impl AgentProfile {
    /// The remote agent name fragment to resolve, falling back to `key`.
    pub fn agent_name_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.agent_name.as_deref().unwrap_or(key)
    }

    /// Tool session parameters. Paths are checked when the session starts.
    pub fn session_spec(&self) -> SessionSpec {
        SessionSpec {
            command: self.command.clone().unwrap_or_default(),
            scripts: self.scripts.clone(),
            system_prompt: self.system_prompt.clone().unwrap_or_default(),
            env: self.env.clone(),
        }
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        match self.kind {
            AgentKind::Bedrock => {
                if self.agent_name_or(key).trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "agent '{key}' needs an agent_name"
                    )));
                }
            }
            AgentKind::Mcp => {
                if self.command.is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "agent '{key}' needs a command"
                    )));
                }
                if self.scripts.is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "agent '{key}' needs at least one script"
                    )));
                }
                if self.system_prompt.as_deref().is_none_or(|p| p.trim().is_empty()) {
                    return Err(ConfigError::ValidationError(format!(
                        "agent '{key}' needs a system_prompt"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from `AGENTCHAT_CONFIG` or `~/.agentchat/config.toml`,
    /// then apply environment overrides:
    /// - `AWS_REGION`
    /// - `ANTHROPIC_API_KEY`
    /// - `AGENTCHAT_MODEL`
    /// - `AGENTCHAT_MODEL_BACKEND`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("AGENTCHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path);
        Self::load_at(&path)
    }

    /// Like [`load`](Self::load), with an explicit file path.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.agentchat/config.toml`
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.aws.region = Some(region);
        }
        if self.model.api_key.is_none() {
            self.model.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if let Ok(model) = std::env::var("AGENTCHAT_MODEL") {
            self.model.model_id = model;
        }
        if let Ok(backend) = std::env::var("AGENTCHAT_MODEL_BACKEND") {
            self.model.backend = backend.parse()?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentchat")
    }

    /// Validate value ranges and per-profile required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.max_prompt_chars == 0 {
            return Err(ConfigError::ValidationError(
                "chat.max_prompt_chars must be > 0".into(),
            ));
        }
        if self.chat.queue_capacity == Some(0) {
            return Err(ConfigError::ValidationError(
                "chat.queue_capacity must be > 0 when set".into(),
            ));
        }
        if self.chat.history_limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "chat.history_limit must be > 0 when set".into(),
            ));
        }
        if self.agentic.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agentic.max_iterations must be > 0".into(),
            ));
        }
        if self.agentic.worker_threads == 0 {
            return Err(ConfigError::ValidationError(
                "agentic.worker_threads must be > 0".into(),
            ));
        }
        for (key, profile) in &self.agents {
            profile.validate(key)?;
        }
        Ok(())
    }

    /// Look up a profile by key.
    pub fn profile(&self, key: &str) -> Option<&AgentProfile> {
        self.agents.get(key)
    }

    /// Generate a commented example config (for the `config init` command).
    pub fn example_toml() -> String {
        let mut config = Self::default();
        config.agents.insert(
            "support".into(),
            AgentProfile {
                name: "Support Agent".into(),
                kind: AgentKind::Bedrock,
                instructions: "Ask about orders and returns.".into(),
                agent_name: Some("support".into()),
                alias: default_alias(),
                ..AgentProfile::default()
            },
        );
        config.agents.insert(
            "devops".into(),
            AgentProfile {
                name: "DevOps Tools".into(),
                kind: AgentKind::Mcp,
                instructions: "Runs local diagnostic tools.".into(),
                alias: default_alias(),
                command: Some(PathBuf::from("python3")),
                scripts: vec![PathBuf::from("tools/server.py")],
                system_prompt: Some("You are a DevOps assistant. Use the tools provided.".into()),
                ..AgentProfile::default()
            },
        );
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
