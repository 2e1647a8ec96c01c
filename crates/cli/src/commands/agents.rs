//! `agentchat agents`: List configured agent profiles.

use agentchat_agent::DirectTarget;
use agentchat_config::AgentKind;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, remote: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if config.agents.is_empty() {
        println!("No agents configured. Run `agentchat config init` for an example.");
        return Ok(());
    }

    for (key, profile) in &config.agents {
        let kind = match profile.kind {
            AgentKind::Bedrock => "bedrock",
            AgentKind::Mcp => "mcp",
        };
        println!("{key:<16} {kind:<8} {}", profile.name);
        if !profile.instructions.is_empty() {
            println!("{:<26}{}", "", profile.instructions.lines().next().unwrap_or_default());
        }
    }

    if !remote {
        return Ok(());
    }

    let registry = agentchat_gateway::build_registry(&config).await?;
    let invoker = registry.direct();

    println!();
    println!("Remote agents ({}):", invoker.runtime().name());
    for agent in invoker.runtime().list_agents().await? {
        println!("   {:<14} {}", agent.id, agent.name);
    }

    println!();
    println!("Resolution:");
    for (key, profile) in config.agents.iter().filter(|(_, p)| p.kind == AgentKind::Bedrock) {
        let target = DirectTarget {
            agent_name: profile.agent_name_or(key).to_string(),
            alias: profile.alias.clone(),
        };
        match invoker.resolve(&target).await {
            Ok(resolved) => println!("   {key:<16} agent {} alias {}", resolved.agent_id, resolved.alias_id),
            Err(e) => println!("   {key:<16} {e}"),
        }
    }

    Ok(())
}
