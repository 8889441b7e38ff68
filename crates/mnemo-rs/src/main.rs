//! `mnemo` binary: loads config and serves the memory-backed chat API.

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use mnemo_rs::config::{LayeredConfigOptions, MnemoConfig};
use mnemo_rs::server::{AppState, serve};
use mnemo_rs::{build_llm, build_memory, init_logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the Mnemo server.
#[derive(Parser)]
#[command(name = "mnemo", version)]
struct Cli {
    /// Extra mnemo.json5 layered on top of the user and cwd configs
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,
    /// Override `server.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting mnemo (config_set={}, host_set={}, port_set={})",
        cli.config.is_some(),
        cli.host.is_some(),
        cli.port.is_some()
    );

    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered =
        MnemoConfig::load_layered_with_options(options).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let config = layered.config;

    let llm = build_llm(&config.llm)?;
    let memory = build_memory(&config, llm)?;

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let state = Arc::new(AppState::new(Arc::new(memory)));
    serve(state, addr).await.context("server failed")?;
    Ok(())
}
