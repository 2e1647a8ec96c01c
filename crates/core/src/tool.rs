//! Tool session boundary: external tools discovered from, and executed by,
//! a side-channel process.
//!
//! A session is acquired at the start of one top-level request and closed
//! at its end. It is never shared between concurrent requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SessionError, ValidationError};
use crate::provider::ToolDefinition;

/// A tool advertised by the external process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolDescriptor {
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// A request to execute a tool, correlated by the model's call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The textual result of a tool call. `call_id` always names the call it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
    pub is_error: bool,
}

/// Prefix marking a tool result that reports a failure.
pub const TOOL_ERROR_PREFIX: &str = "Error: ";

impl ToolResult {
    pub fn for_call(call: &ToolCall, output: String) -> Self {
        let is_error = output.starts_with(TOOL_ERROR_PREFIX);
        Self {
            call_id: call.id.clone(),
            output,
            is_error,
        }
    }
}

/// Tools discovered in one session, keyed by unique name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool. A later descriptor with the same name replaces the earlier one.
    pub fn insert(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions in name order, for sending to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(ToolDescriptor::to_definition).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolDescriptor> for ToolCatalog {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        let mut catalog = ToolCatalog::new();
        for descriptor in iter {
            catalog.insert(descriptor);
        }
        catalog
    }
}

/// Everything needed to start a tool session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSpec {
    /// Executable that hosts the tool server (e.g. an interpreter)
    pub command: PathBuf,
    /// Script arguments passed to the executable
    pub scripts: Vec<PathBuf>,
    /// System prompt for the model driving the tools
    pub system_prompt: String,
    /// Extra environment for the child process
    pub env: BTreeMap<String, String>,
}

impl SessionSpec {
    pub fn new(command: impl Into<PathBuf>, scripts: Vec<PathBuf>, system_prompt: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            scripts,
            system_prompt: system_prompt.into(),
            env: BTreeMap::new(),
        }
    }

    /// Check that the executable and every script exist. No process is
    /// started when this fails.
    pub fn validate(&self) -> Result<()> {
        if self.command.as_os_str().is_empty() {
            return Err(ValidationError::MissingField("command".into()).into());
        }
        if resolve_executable(&self.command).is_none() {
            return Err(ValidationError::PathNotFound(self.command.display().to_string()).into());
        }
        if self.scripts.is_empty() {
            return Err(ValidationError::MissingField("scripts".into()).into());
        }
        if let Some(missing) = self.scripts.iter().find(|s| !s.is_file()) {
            return Err(ValidationError::PathNotFound(missing.display().to_string()).into());
        }
        Ok(())
    }
}

/// Resolve a bare program name against `PATH`; paths are checked as given.
fn resolve_executable(command: &Path) -> Option<PathBuf> {
    if command.components().count() > 1 || command.is_absolute() {
        return command.is_file().then(|| command.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
}

/// A live connection to an external tool process.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Tools offered by the process. Queried once, then served from cache.
    async fn discover(&self) -> Result<ToolCatalog>;

    /// Run a tool and return its text output.
    ///
    /// Never fails: problems come back as text starting with
    /// [`TOOL_ERROR_PREFIX`] so the model can react to them.
    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String;

    /// Release the process and its pipes. Safe to call more than once.
    async fn close(&self) -> std::result::Result<(), SessionError>;
}

/// Starts tool sessions from a validated spec.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, spec: &SessionSpec) -> Result<Box<dyn ToolSession>>;
}
