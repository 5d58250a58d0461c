//! Presence status endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub online_users: Vec<String>,
}

/// GET /api/v1/online-users
pub async fn online_users(State(state): State<AppState>) -> Result<Json<OnlineUsersResponse>> {
    let online_users = state.hub.list_online().await?;
    Ok(Json(OnlineUsersResponse { online_users }))
}
