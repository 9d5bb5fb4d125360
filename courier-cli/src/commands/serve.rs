//! Courier serve command for running the API server
//!
//! The server hosts every session in-process and exposes the REST API.
//! Connections use the simulated protocol client, which produces a pairing
//! code and completes pairing after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use courier_core::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SimulatedConnectionFactory,
};
use courier_server::{AppState, CourierServer, ServerConfig};
use tracing::info;

use crate::client::CourierClient;
use crate::config::{ConfigLoader, CourierConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Subcommand (status)
    #[command(subcommand)]
    pub command: Option<ServeCommand>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Seconds before a simulated link completes pairing
    #[arg(long, default_value_t = 5)]
    pub pair_after_secs: u64,

    /// Keep credentials in memory only
    #[arg(long)]
    pub ephemeral: bool,
}

/// Subcommands for serve
#[derive(Debug, Subcommand)]
pub enum ServeCommand {
    /// Show whether a server is answering on the configured address
    Status,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let server_config = server_config(&args, &config);

    match &args.command {
        Some(ServeCommand::Status) => show_status(&server_config).await,
        None => run_foreground(&args, config, server_config).await,
    }
}

/// Run the server in the foreground until ctrl-c
async fn run_foreground(
    args: &ServeArgs,
    config: CourierConfig,
    server_config: ServerConfig,
) -> Result<()> {
    let credentials: Arc<dyn CredentialStore> = if args.ephemeral {
        Arc::new(MemoryCredentialStore::new())
    } else {
        info!(dir = %config.storage.credentials_dir.display(), "persisting credentials");
        Arc::new(FileCredentialStore::new(&config.storage.credentials_dir))
    };
    let factory = Arc::new(SimulatedConnectionFactory::new(Duration::from_secs(
        args.pair_after_secs,
    )));
    let state = Arc::new(AppState::new(factory, credentials, config.session));

    info!("Starting courier server on {}", server_config.addr());
    CourierServer::with_state(server_config, state)
        .run()
        .await
        .map_err(Into::into)
}

/// Query the health endpoint of a running server
async fn show_status(server_config: &ServerConfig) -> Result<()> {
    let client = CourierClient::new(format!("http://{}", server_config.addr()), "status");
    match client.health().await {
        Ok(health) => {
            println!("Courier server is running on {}", server_config.addr());
            println!("  Version: {}", health.version);
            println!("  Uptime: {}s", health.uptime_seconds);
            println!("  Sessions: {}", health.active_sessions);
        }
        Err(_) => println!("No courier server on {}", server_config.addr()),
    }
    Ok(())
}

/// Merge command-line overrides over the loaded config
fn server_config(args: &ServeArgs, config: &CourierConfig) -> ServerConfig {
    ServerConfig::new(
        args.host.clone().unwrap_or_else(|| config.server.host.clone()),
        args.port.unwrap_or(config.server.port),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(host: Option<&str>, port: Option<u16>) -> ServeArgs {
        ServeArgs {
            command: None,
            port,
            host: host.map(String::from),
            pair_after_secs: 5,
            ephemeral: true,
        }
    }

    #[test]
    fn config_values_used_without_overrides() {
        let mut config = CourierConfig::default();
        config.server.port = 8123;

        let server = server_config(&args(None, None), &config);

        assert_eq!(server.addr(), "127.0.0.1:8123");
    }

    #[test]
    fn flags_override_config() {
        let config = CourierConfig::default();

        let server = server_config(&args(Some("0.0.0.0"), Some(9000)), &config);

        assert_eq!(server.addr(), "0.0.0.0:9000");
    }
}
