//! Startup wiring.
//!
//! Loads the static feed, builds the refresh pipeline and runs it until the
//! process is asked to stop. Anything that fails before the first refresh is
//! fatal and surfaces as a [`StartupError`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::{AppConfig, ConfigurationError, HttpConfig};
use crate::feed::{FeedError, ScheduleIndex, ensure_archive, load_tables};
use crate::filter::RouteStopFilter;
use crate::realtime::{AnySource, RealtimeError};
use crate::refresh::{PeriodicTask, RefreshCycle, RefreshTask, board_channel};
use crate::web::{AppState, BoardState, create_router};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("static feed: {0}")]
    Feed(#[from] FeedError),

    #[error("realtime source: {0}")]
    Realtime(#[from] RealtimeError),

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("feed loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Run the board until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let archive = ensure_archive(&config.static_feed).await?;
    let stop_codes = config.stop_codes();

    let tables = {
        let codes = stop_codes.clone();
        tokio::task::spawn_blocking(move || load_tables(&archive, &codes)).await??
    };
    let index = Arc::new(ScheduleIndex::build(tables, &stop_codes)?);
    let filter = RouteStopFilter::from_stop_codes(&index, &config.routes_for_stops());

    let source = AnySource::from_config(&config.realtime)?;
    info!(source = %source.describe(), "realtime source ready");

    let (sender, receiver) = board_channel(config.channel_capacity);
    let board = BoardState::new();
    let consumer = tokio::spawn(board.clone().consume(receiver));

    let cycle = RefreshCycle::new(
        index,
        filter,
        source,
        config.display_lines,
        config.candidate_count(),
    );
    info!(
        interval_secs = config.update_interval_secs,
        "starting refresh"
    );
    let refresher = PeriodicTask::spawn(RefreshTask::new(cycle, sender), config.update_interval());

    let served = if config.http.enabled {
        let state = AppState::new(board, config.walk_time_by_stop());
        serve(&config.http, state).await
    } else {
        shutdown_signal().await;
        Ok(())
    };

    // Dropping the refresh task drops its sender, which ends the consumer
    refresher.stop().await;
    if let Err(e) = consumer.await {
        warn!(error = %e, "board consumer did not stop cleanly");
    }
    info!("stopped");
    served
}

async fn serve(config: &HttpConfig, state: AppState) -> Result<(), StartupError> {
    let app = create_router(state, &config.static_dir);
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.listen,
            source,
        })?;

    info!("arrivals board listening on http://{}", config.listen);
    info!("  GET  /              - HTML board");
    info!("  GET  /api/arrivals  - latest arrivals as JSON");
    info!("  GET  /health        - health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => error!(error = %e, "failed to listen for Ctrl-C; shutting down"),
    }
}
