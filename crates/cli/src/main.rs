//! AgentChat CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the chat UI and HTTP API
//! - `ask`: Send one prompt and stream the answer to stdout
//! - `agents`: List configured agents (optionally resolve them remotely)
//! - `tools`: Show the tools a tool-backed agent exposes
//! - `config`: Inspect or create the configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "agentchat",
    about = "AgentChat: chat with managed and tool-using agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.agentchat/config.toml)
    #[arg(short, long, global = true, env = "AGENTCHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server with the embedded chat UI
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Send a single prompt to an agent
    Ask {
        /// Agent profile key
        #[arg(short, long)]
        agent: String,

        /// The prompt text
        prompt: String,
    },

    /// List configured agents
    Agents {
        /// Also resolve bedrock agents against the remote service
        #[arg(long)]
        remote: bool,
    },

    /// Start a tool agent's server and list the tools it offers
    Tools {
        /// Agent profile key (must be an mcp agent)
        agent: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Parse and validate the config file
    Validate,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write an example config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // stderr keeps `ask` output on stdout clean.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Ask { agent, prompt } => commands::ask::run(config_path, &agent, &prompt).await?,
        Commands::Agents { remote } => commands::agents::run(config_path, remote).await?,
        Commands::Tools { agent } => commands::tools::run(config_path, &agent).await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
        },
    }

    Ok(())
}
