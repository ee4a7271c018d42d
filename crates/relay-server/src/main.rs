//! `gpt-relay` binary entrypoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relay_auth::Authenticator;
use relay_cache::SessionCache;
use relay_geoip::GeoIpCache;
use relay_server::{KnownModels, OpenAiUpstream, RelayConfig, RelayServer};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gpt-relay", version, about = "Authenticating SSE relay for chat completions")]
struct Args {
    /// Config file (defaults to ./config.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port, overrides config and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = RelayConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let cache = SessionCache::connect(&config.redis)
        .await
        .context("Failed to connect session cache")?;
    let heartbeat = cache.spawn_heartbeat(config.redis.heartbeat_interval());
    info!(backend = cache.backend(), "Session cache ready");

    let geo = match GeoIpCache::open(
        &config.geoip.db_path,
        &config.geoip.provider_url,
        &config.geoip.lang,
    ) {
        Ok(geo) => Some(geo),
        Err(e) => {
            warn!(error = %e, path = ?config.geoip.db_path, "Geo-IP store unavailable, continuing without localization");
            None
        }
    };

    let upstream =
        OpenAiUpstream::new(&config.upstream).context("Failed to build upstream client")?;
    let models = KnownModels::load(&upstream).await;
    let auth = Authenticator::new(cache, geo);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let server = RelayServer::new(config, upstream, auth, models);
    server
        .serve(listener, shutdown_signal())
        .await
        .context("Server error")?;

    heartbeat.abort();
    info!("Relay stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
