//! fadebin server entry point.
//!
//! Boots the HTTP service and the eviction sweeper, then serves until
//! SIGINT/SIGTERM. Logging goes to stderr as JSON.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use fadebin_core::{AppConfig, SqliteStore, Sweeper};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod admission;
mod error;
mod handler;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        default_expiry = %config.default_expiry,
        write_rate_limit = config.write_rate_limit,
        read_rate_limit = config.read_rate_limit,
        "starting fadebin server"
    );

    let store = SqliteStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening database at {}", config.db_path.display()))?
        .with_timeouts(config.store_timeout(), config.sweep_timeout());
    let store = Arc::new(store);

    let sweeper = Sweeper::new(store.clone(), config.sweep_interval()).start();

    let addr: SocketAddr = config.bind_addr.parse()?;
    let drain_timeout = config.shutdown_timeout();
    let app = handler::router(handler::AppState::new(store, config));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    let (signalled_tx, mut signalled_rx) = watch::channel(false);
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    let drain_deadline = async {
        if signalled_rx.wait_for(|signalled| *signalled).await.is_ok() {
            tokio::time::sleep(drain_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => result?,
        () = drain_deadline => {
            tracing::warn!(timeout_secs = drain_timeout.as_secs(), "in-flight requests did not drain in time");
        }
    }

    sweeper.stop().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
