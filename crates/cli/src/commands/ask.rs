//! `agentchat ask`: One prompt, answer streamed to stdout.

use agentchat_agent::{RenderSink, StreamingCoordinator};
use agentchat_core::message::ConversationStore;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Prints fragments as they arrive and remembers the first error.
#[derive(Default)]
pub struct TerminalSink {
    failure: Mutex<Option<String>>,
}

impl TerminalSink {
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl RenderSink for TerminalSink {
    fn render(&self, fragment: &str, _pending: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{fragment}");
        let _ = stdout.flush();
    }

    fn error(&self, message: &str) {
        let mut failure = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        failure.get_or_insert_with(|| message.to_string());
    }
}

pub async fn run(config_path: Option<&Path>, agent: &str, prompt: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = agentchat_gateway::build_registry(&config).await?;
    let strategy = registry.strategy(agent)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let coordinator = StreamingCoordinator::new("cli", session_id, Arc::new(ConversationStore::new()), &config.chat);

    coordinator.submit(prompt, strategy)?;
    let sink = TerminalSink::default();
    coordinator.drain(&sink).await;
    println!();

    match sink.failure() {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_keeps_first_error() {
        let sink = TerminalSink::default();
        assert!(sink.failure().is_none());
        sink.error("first");
        sink.error("second");
        assert_eq!(sink.failure().as_deref(), Some("first"));
    }
}
