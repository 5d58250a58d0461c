use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::hub::HubStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub hub: HubStats,
    pub store_backend: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let hub = state.hub.stats().await?;

    Ok(Json(StatsResponse {
        hub,
        store_backend: state.store.backend_name(),
    }))
}
