use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::api_routes;
use crate::config::ServerConfig;
use crate::websocket::ws_handler;

use super::AppState;

/// Chat payloads are short text; anything larger is rejected before parsing.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server);

    Router::new()
        // WebSocket endpoint
        .route("/ws", get(ws_handler))
        .merge(api_routes())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
