//! `agentchat serve`: Start the HTTP server and chat UI.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port: Option<u16>, host: Option<String>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(host) = host {
        config.gateway.host = host;
    }

    println!("AgentChat");
    println!("   Open:    http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Agents:  {}", config.agents.len());
    println!("   Model:   {} ({:?})", config.model.model_id, config.model.backend);

    agentchat_gateway::start(config).await?;
    Ok(())
}
