use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use bytes::Bytes;

use crate::{
    handler::{ApiError, ApiResult},
    relay::Relay,
};

pub fn ingest_router() -> Router<Arc<Relay>> {
    Router::new().route("/topic/{*key}", post(publish))
}

/// Upstream delivery of one encoded frame published on `key`.
async fn publish(
    State(relay): State<Arc<Relay>>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    if !relay.accepts(&key) {
        return Err(ApiError::not_found(format!("no subscriber for {}", key)));
    }
    log::trace!("received: {} ({} bytes)", key, body.len());
    relay.ingress().on_frame_received(&body);
    Ok(StatusCode::ACCEPTED)
}
