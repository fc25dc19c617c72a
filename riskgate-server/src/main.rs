//! # Riskgate Server
//!
//! HTTP surface for the signup-risk classification service: a single
//! classify endpoint backed by the blocklist lifecycle manager, IP
//! matcher, and MX resolver in `riskgate-core`.

pub mod config;
pub mod errors;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use riskgate_core::{Loader, MxResolver, Registry};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use routes::AppState;

/// Command line arguments for the riskgate server.
#[derive(Parser, Debug)]
#[command(name = "riskgate-server")]
#[command(about = "Signup-risk classification service")]
struct Args {
    /// Server port (overrides config).
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config).
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riskgate_server=info,riskgate_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(base_dir = %config.loader.base_dir.display(), "starting riskgate server");

    let registry = Arc::new(Registry::new());
    let resolver = Arc::new(MxResolver::new());
    resolver.spawn_refill_task();

    let loader = Loader::new(registry.clone(), config.loader.clone());
    loader.clone().run();

    let state = AppState {
        registry,
        resolver,
        loader: loader.clone(),
    };

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.socket_addr()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(loader))
        .await?;

    Ok(())
}

async fn shutdown_signal(loader: Arc<Loader>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    loader.shutdown().await;
}
