use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use frame_bus::{FrameError, FrameResult};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    handler::{frame::frame_router, ingest::ingest_router, stats::stats_router},
    relay::Relay,
};

pub(crate) async fn bind(addr: &str) -> FrameResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| FrameError::Transport(format!("cannot listen on {}: {}", addr, e)))
}

pub(crate) fn router(relay: Arc<Relay>) -> Router {
    let body_limit = relay.config().max_payload_bytes;
    Router::new()
        .route("/", get(index))
        .merge(ingest_router())
        .merge(frame_router())
        .merge(stats_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(relay)
}

pub(crate) fn start_api_server(
    listener: TcpListener,
    relay: Arc<Relay>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(relay);
        match listener.local_addr() {
            Ok(addr) => log::info!("API server started on {}", addr),
            Err(e) => log::warn!("API server started on unknown address: {}", e),
        }
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(cancel))
            .await
        {
            log::error!("Error running API server: {}", e);
        }
    })
}

async fn shutdown_signal(cancel: CancellationToken) {
    cancel.cancelled().await;
    log::info!("Shutting down API server...");
}

async fn index() -> &'static str {
    "frame relay"
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
