#![forbid(unsafe_code)]

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use lensgate_proxy::{
    build_router, AppState, HttpSessionInitiator, ProxyArgs, ProxyConfig, RuntimeMode,
};
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = ProxyArgs::parse();
    lensgate_common::init_tracing_with_default(&args.log_filter);

    let config = ProxyConfig::load(&args)?;
    config.check_bind_allowed()?;

    match config.api_key.as_ref() {
        Some(key) => tracing::info!("inference API key configured ({})", key.hint()),
        None => tracing::warn!(
            "LENSGATE_API_KEY is not set; session initialization will fail until it is configured"
        ),
    }
    tracing::info!("inference server {}", config.server_url);
    if config.mode == RuntimeMode::Production {
        tracing::info!("serving frontend from {}", config.static_dir.display());
    } else {
        tracing::info!("development mode: API only, frontend served by the asset dev server");
    }

    let initiator = HttpSessionInitiator::new(&config.server_url, config.upstream_timeout)?;
    let addr = config.bind_addr;
    let app = build_router(AppState::new(config, Arc::new(initiator)));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::AddrInUse => {
            let fallback_addr = SocketAddr::new(addr.ip(), 0);
            tracing::warn!(
                "proxy bind {} is already in use, falling back to {}",
                addr,
                fallback_addr
            );
            TcpListener::bind(fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!("proxy listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
