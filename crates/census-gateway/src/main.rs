//! census service
//!
//! - Every request: counter increment + one `http.request` span
//! - Spans printed locally, optionally exported over OTLP
//! - `/metrics`: CPU / RAM / disk gauges sampled per scrape, Prometheus text
//! - Graceful shutdown on SIGINT / SIGTERM; `/readyz` reports draining

use census_core::error::{CensusError, Result};
use census_gateway::{app_state::AppState, config, obs, router};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_from_env()?;
    let _telemetry = obs::telemetry::init(&cfg.telemetry)?;

    let listen = cfg.service.listen_addr()?;
    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "census starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| CensusError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| CensusError::Internal(format!("server failed: {e}")))?;

    tracing::info!("census stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    state.set_draining();
    tracing::info!("shutdown signal received, draining");
}
