//! `agentchat config`: Configuration management commands.

use agentchat_config::{AgentKind, AppConfig, ModelBackend};
use anyhow::Context;
use std::path::Path;

/// Non-fatal problems worth pointing out in a config that parsed and validated.
pub fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.agents.is_empty() {
        warnings.push("No agents configured".to_string());
    }

    if config.model.backend == ModelBackend::Anthropic && config.model.api_key.is_none() {
        warnings.push("model.backend is anthropic but no API key is set (ANTHROPIC_API_KEY)".into());
    }

    if config.aws.region.is_none() {
        warnings.push("No AWS region set; the SDK default chain will be used".into());
    }

    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway bound to 0.0.0.0 with no authentication in front of it".into());
    }

    for (key, profile) in config.agents.iter().filter(|(_, p)| p.kind == AgentKind::Mcp) {
        if let Err(e) = profile.session_spec().validate() {
            warnings.push(format!("Agent '{key}' cannot start its tool server: {e}"));
        }
    }

    warnings
}

pub fn validate(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Validating {}", super::config_file(config_path).display());

    let config = super::load_config(config_path)?;
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Model:     {} ({:?})", config.model.model_id, config.model.backend);
    println!("   Region:    {}", config.aws.region.as_deref().unwrap_or("(default)"));
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Agents:    {}", config.agents.len());

    Ok(())
}

pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", super::config_file(config_path).display());
}

pub fn init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let file = super::config_file(config_path);
    if file.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", file.display());
    }
    if let Some(dir) = file.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&file, AppConfig::example_toml())
        .with_context(|| format!("Failed to write {}", file.display()))?;
    println!("Wrote example config to {}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_config::AgentProfile;
    use std::path::PathBuf;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::default_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn init_writes_a_loadable_file_and_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("config.toml");

        init(Some(&file), false).unwrap();
        let config = AppConfig::load_from(&file).unwrap();
        assert_eq!(config.agents.len(), 2);

        assert!(init(Some(&file), false).is_err());
        init(Some(&file), true).unwrap();
    }

    #[test]
    fn warns_about_unstartable_tool_agents() {
        let mut config = AppConfig::default();
        config.agents.insert(
            "tools".into(),
            AgentProfile {
                name: "Tools".into(),
                kind: AgentKind::Mcp,
                command: Some(PathBuf::from("/bin/sh")),
                scripts: vec![PathBuf::from("/definitely/missing.py")],
                system_prompt: Some("sys".into()),
                ..AgentProfile::default()
            },
        );

        let warnings = warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("'tools'")));
    }

    #[test]
    fn empty_config_warns_about_missing_agents() {
        let warnings = warnings(&AppConfig::default());
        assert!(warnings.iter().any(|w| w.contains("No agents")));
    }
}
