pub mod agents;
pub mod ask;
pub mod config_cmd;
pub mod serve;
pub mod tools;

use agentchat_config::AppConfig;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// The config file in effect: `--config`, else the default location.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(AppConfig::default_path)
}

/// Load, apply env overrides, validate.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let file = config_file(path);
    AppConfig::load_at(&file).with_context(|| format!("Failed to load config from {}", file.display()))
}
