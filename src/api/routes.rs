use axum::{
    routing::{get, post, put},
    Router,
};

use crate::server::AppState;

use super::health::{health, stats};
use super::messages::{get_messages, list_chats, mark_messages_seen, send_message};
use super::metrics::prometheus_metrics;
use super::presence::online_users;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                .route("/online-users", get(online_users))
                .route("/chats", get(list_chats))
                .route("/messages", post(send_message).get(get_messages))
                .route("/messages/seen", put(mark_messages_seen)),
        )
}
