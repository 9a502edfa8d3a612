//! `relay` - real-time chat relay server.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::logging::{LogFormat, init_subscriber};
use relay_server::config::{ServerConfig, load_config};
use relay_server::metrics::install_recorder;
use relay_server::server::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "relay", about = "Real-time chat relay over WebSocket")]
struct Cli {
    /// Host to bind (overrides config and `RELAY_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config and `RELAY_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// JSON config file, merged over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format: `compact` or `json`.
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

impl Cli {
    fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = load_config(self.config.as_deref()).context("failed to load config")?;
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_subscriber(&cli.log_level, cli.log_format);

    let config = cli.resolve_config()?;
    tracing::debug!(?config, "resolved config");

    let metrics = install_recorder().context("failed to install metrics recorder")?;
    let server = RelayServer::new(config, metrics);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "relay ready");

    wait_for_signal().await?;
    tracing::info!("shutdown signal received");
    let _ = server.shutdown().graceful_shutdown(vec![handle], None).await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["relay"]);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "relay",
            "--host",
            "127.0.0.1",
            "--port",
            "9100",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["relay", "--log-format", "yaml"]).is_err());
    }
}
