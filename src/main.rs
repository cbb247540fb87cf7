mod cli;
mod client;
mod config;
mod logging;
mod poller;
mod repos;
mod tui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use dotenvy::dotenv;
use tracing::info;

use crate::client::RegistryClient;
use crate::config::AppConfig;
use crate::logging::{LogTarget, init_logging};
use crate::tui::TuiApp;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rdash",
    version,
    about = "Terminal dashboard for the registry watcher: browse repositories, pick tags, deploy"
)]
pub struct Cli {
    /// Use plain line mode (disable TUI)
    #[arg(long, action = ArgAction::SetTrue)]
    no_tui: bool,

    /// Registry watcher base URL
    #[arg(long)]
    server_url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    update_frequency_ms: Option<u64>,

    /// UI theme (dark, light)
    #[arg(long)]
    theme: Option<String>,

    /// Log level or filter directive (defaults to RUST_LOG, then info)
    #[arg(long)]
    log_level: Option<String>,

    /// Log file used in TUI mode
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let mut notices = Vec::new();
    let cfg = AppConfig::from_cli(&cli, &mut notices)?;

    let target = if cli.no_tui {
        LogTarget::Stderr
    } else {
        LogTarget::File(&cfg.log_file)
    };
    init_logging(target, cli.log_level.as_deref())?;
    for notice in &notices {
        notice.log();
    }
    info!(?cfg, "app config");

    let client = RegistryClient::new(cfg.server_url.clone())
        .context("configure backend client")?
        .with_http_config(&cfg.http);

    if cli.no_tui {
        crate::cli::run_line_mode(client).await
    } else {
        run_tui(cfg, client)
    }
}

fn run_tui(cfg: AppConfig, client: RegistryClient) -> Result<()> {
    let mut app =
        TuiApp::new("rdash", cfg.server_url.clone(), &cfg.theme).with_client(client.clone());
    app.start_polling(client, Duration::from_millis(cfg.update_frequency_ms));
    app.run()
}
