use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use frame_bus::{codec::encode_jpeg, sink::Texture};
use jpeg_encoder::ColorType;
use serde::Serialize;

use crate::{
    handler::{ApiError, ApiJsonResult, ApiResult},
    relay::Relay,
};

pub fn frame_router() -> Router<Arc<Relay>> {
    Router::new()
        .route("/frame", get(get_frame))
        .route("/frame/info", get(get_frame_info))
}

#[derive(Serialize)]
struct FrameInfo {
    width: u32,
    height: u32,
    seq: u64,
}

fn visible_texture(relay: &Relay) -> ApiResult<Arc<Texture>> {
    relay
        .visible()
        .current()
        .ok_or_else(|| ApiError::not_found("no frame presented yet"))
}

/// The visible image, re-encoded as JPEG.
async fn get_frame(State(relay): State<Arc<Relay>>) -> ApiResult<Response> {
    let texture = visible_texture(&relay)?;
    let quality = relay.config().snapshot_quality;
    let seq = texture.seq;
    let jpeg = tokio::task::spawn_blocking(move || {
        let width = u16::try_from(texture.width).context("texture too wide for JPEG")?;
        let height = u16::try_from(texture.height).context("texture too tall for JPEG")?;
        encode_jpeg(&texture.data, width, height, ColorType::Rgba, quality)
    })
    .await??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::HeaderName::from_static("x-frame-seq"), seq.to_string()),
        ],
        jpeg,
    )
        .into_response())
}

async fn get_frame_info(State(relay): State<Arc<Relay>>) -> ApiJsonResult<FrameInfo> {
    let texture = visible_texture(&relay)?;
    Ok(Json(FrameInfo {
        width: texture.width,
        height: texture.height,
        seq: texture.seq,
    }))
}
