//! Explore server - HTTP front end for explore state resolution.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use explore::io::config::load_config;
use explore::io::store::StorePaths;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "explore-server")]
#[command(about = "HTTP API resolving chart explore state")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "explore.toml")]
    config: PathBuf,

    /// Address to bind the server to (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Store root (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("explore_server=info".parse()?)
                .add_directive("explore=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let cfg = load_config(&args.config)?;

    let data_dir = args
        .data_dir
        .unwrap_or_else(|| cfg.resolve_data_dir(&args.config));
    if !data_dir.is_dir() {
        info!(data_dir = %data_dir.display(), "store directory missing, every lookup will miss");
    }
    info!(data_dir = %data_dir.display(), "starting explore-server");

    let state = AppState::from_store(StorePaths::new(&data_dir), cfg.request_params.ignored)
        .context("build application state")?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let bind = args.bind.unwrap_or(cfg.server.bind);
    let port = args.port.unwrap_or(cfg.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("parse listen address {bind}:{port}"))?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
