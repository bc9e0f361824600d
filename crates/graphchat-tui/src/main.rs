//! Terminal chat client for a knowledge-graph question-answering backend.

use anyhow::Context;
use clap::Parser;
use graphchat_config::{GraphChatConfig, LayeredConfigOptions, TransportKind};
use graphchat_core::build_transport;
use graphchat_tui::{EventBus, TuiConfig};
use log::{LevelFilter, debug, info};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Command-line options for the graphchat client.
#[derive(Parser)]
#[command(name = "graphchat", version)]
struct Cli {
    /// Optional path to a graphchat.json5 config file, applied over the layered config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend base URL (overrides config and GRAPHCHAT_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
    /// Transport to use: http or websocket
    #[arg(long)]
    transport: Option<TransportKind>,
    /// Display name shown in the header
    #[arg(long)]
    user: Option<String>,
}

/// Entry point for the graphchat TUI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.ui.log_file.as_deref())?;
    info!(
        "starting graphchat (transport={}, base_url={})",
        config.backend.transport.as_str(),
        config.backend.base_url
    );

    let transport = build_transport(&config.backend)
        .await
        .with_context(|| format!("failed to set up transport to {}", config.backend.base_url))?;
    let events = EventBus::new(256);
    graphchat_tui::run(transport, events, TuiConfig::from_config(&config)).await
}

/// Load the layered config and apply command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<GraphChatConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered = GraphChatConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    let mut config = layered.config;

    if let Some(base_url) = cli.base_url.as_ref() {
        config.backend.base_url.clone_from(base_url);
    }
    if let Some(transport) = cli.transport {
        config.backend.transport = transport;
    }
    if let Some(user) = cli.user.as_ref() {
        config.ui.user_name = Some(user.clone());
    }
    config
        .validate()
        .context("invalid command-line overrides")?;
    Ok(config)
}

/// Initialize `env_logger`, writing to `log_file` when set.
///
/// Without a log file nothing is logged unless `RUST_LOG` asks for it, since
/// stderr shares the terminal with the UI.
fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let mut builder = env_logger::builder();
    builder.format_timestamp_millis();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            builder
                .filter_level(LevelFilter::Info)
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(LevelFilter::Off);
        }
    }
    let _ = builder.parse_default_env().try_init();
    debug!("logging initialized (log_file={})", log_file.unwrap_or("none"));
    Ok(())
}
