//! `agentchat tools`: Start a tool server, list its catalog, shut it down.

use agentchat_config::AgentKind;
use agentchat_core::tool::SessionLauncher;
use agentchat_tools::McpLauncher;
use std::path::Path;
use tracing::warn;

pub async fn run(config_path: Option<&Path>, key: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let profile = config
        .profile(key)
        .ok_or_else(|| anyhow::anyhow!("Unknown agent profile: {key}"))?;
    if profile.kind != AgentKind::Mcp {
        anyhow::bail!("Agent '{key}' is not a tool agent");
    }

    let spec = profile.session_spec();
    spec.validate()?;

    let session = McpLauncher::new()
        .with_call_timeout(config.agentic.tool_timeout())
        .launch(&spec)
        .await?;
    let discovered = session.discover().await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Tool session teardown failed");
    }
    let catalog = discovered?;

    println!("{} tools from {}", catalog.len(), spec.command.display());
    for tool in catalog.iter() {
        println!();
        println!("  {}", tool.name);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
        println!("    schema: {}", tool.input_schema);
    }

    Ok(())
}
