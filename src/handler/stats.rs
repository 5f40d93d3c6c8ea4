use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use frame_bus::stats::PipelineStats;
use serde::Serialize;

use crate::{handler::ApiJsonResult, relay::Relay};

pub fn stats_router() -> Router<Arc<Relay>> {
    Router::new().route("/stats", get(get_stats))
}

#[derive(Serialize)]
struct StatsResponse {
    key_expr: String,
    #[serde(flatten)]
    stats: PipelineStats,
}

async fn get_stats(State(relay): State<Arc<Relay>>) -> ApiJsonResult<StatsResponse> {
    Ok(Json(StatsResponse {
        key_expr: relay.key_expr().to_string(),
        stats: relay.stats(),
    }))
}
