//! Call Relay Server
//!
//! Presence and signaling relay for peer-to-peer call setup. Clients
//! register a user identity over WebSocket and exchange call-lifecycle
//! messages routed by identity; an HTTP API alongside handles accounts,
//! the user directory and media join tokens.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use call_relay::api::{run_api_server, ApiState};
use call_relay::auth::TokenService;
use call_relay::config::{RelayConfig, CONFIG_FILE};
use call_relay::directory::UserDirectory;
use call_relay::media::MediaTokenIssuer;
use call_relay::presence::PresenceRegistry;
use call_relay::server::{ServerConfig, WebSocketServer};

/// Call Relay Server
///
/// WebSocket signaling relay for peer-to-peer call setup
#[derive(Parser, Debug)]
#[command(name = "call-relay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// WebSocket port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP API port (overrides the config file)
    #[arg(long)]
    http_port: Option<u16>,

    /// Bind address (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    info!("Call Relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = RelayConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.ws_port = port;
    }
    if let Some(port) = args.http_port {
        config.server.http_port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    if config.uses_default_secrets() {
        warn!(
            "Running with built-in development secrets; configure [auth] and [media] in {}",
            args.config.display()
        );
    }

    // Collaborator services behind the HTTP API
    let directory = match &config.directory.path {
        Some(path) => Arc::new(UserDirectory::with_file(path)?),
        None => Arc::new(UserDirectory::new()),
    };
    let api_state = ApiState {
        directory,
        tokens: Arc::new(TokenService::new(
            &config.auth.token_secret,
            config.auth.token_ttl_days,
        )),
        media: Arc::new(MediaTokenIssuer::new(
            &config.media.app_id,
            &config.media.app_certificate,
            config.media.credential_ttl_secs,
        )),
    };

    // The signaling relay and its presence registry
    let registry = Arc::new(PresenceRegistry::new());
    let ws_config = ServerConfig::new(config.server.bind.clone(), config.server.ws_port);
    let relay = Arc::new(WebSocketServer::new(ws_config, registry));

    // One signal stops both listeners
    let (shutdown_tx, _) = broadcast::channel(1);
    let api_shutdown = shutdown_tx.subscribe();
    let relay_handle = Arc::clone(&relay);
    tokio::spawn(async move {
        wait_for_stop_signal().await;
        info!("Shutting down");
        relay_handle.shutdown();
        let _ = shutdown_tx.send(());
    });

    // Run the HTTP API alongside the relay
    let api_addr = format!("{}:{}", config.server.bind, config.server.http_port);
    let origins = config.cors.allowed_origins.clone();
    let api_task =
        tokio::spawn(async move { run_api_server(api_addr, api_state, &origins, api_shutdown).await });

    // Run the relay until shutdown
    relay.run().await?;
    api_task.await??;

    info!("Server stopped");
    Ok(())
}

/// Block until the process is asked to stop (SIGINT or SIGTERM)
async fn wait_for_stop_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation failed");
        tokio::select! {
            _ = signal::ctrl_c() => info!("SIGINT received"),
            _ = sigterm.recv() => info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Ctrl+C received");
    }
}
