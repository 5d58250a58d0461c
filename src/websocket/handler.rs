use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::{extract_bearer_token, JwtValidator};
use crate::error::AppError;
use crate::hub::Session;
use crate::metrics::WsConnectionMetrics;
use crate::server::AppState;

use super::message::{ClientMessage, ServerMessage};

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    pub token: Option<String>,
}

/// WebSocket upgrade handler
#[tracing::instrument(
    name = "ws.upgrade",
    skip(ws, state, query, headers),
    fields(user_id = ?query.user_id, product_id = ?query.product_id)
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let user_id = match authorize_handshake(&query, &headers, state.jwt_validator.as_deref()) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };
    let product_id = query.product_id.filter(|p| !p.is_empty());

    tracing::info!(user_id = %user_id, "WebSocket upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, product_id))
}

/// Resolve the connecting user before the upgrade.
///
/// `user_id` is always required. When a validator is configured the caller
/// must also present a token (query `token` or `Authorization: Bearer`)
/// whose identity matches `user_id`.
pub fn authorize_handshake(
    query: &WsQuery,
    headers: &HeaderMap,
    validator: Option<&JwtValidator>,
) -> Result<String, AppError> {
    let Some(user_id) = query.user_id.as_deref().filter(|id| !id.is_empty()) else {
        WsConnectionMetrics::record_missing_user();
        return Err(AppError::Validation("Missing user_id parameter".to_string()));
    };

    let Some(validator) = validator else {
        return Ok(user_id.to_string());
    };

    let token = query
        .token
        .as_deref()
        .or_else(|| extract_bearer_token(headers));

    let Some(token) = token else {
        WsConnectionMetrics::record_unauthorized();
        return Err(AppError::Auth("Missing authentication token".to_string()));
    };

    let verified = validator.verify_identity(token).inspect_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        WsConnectionMetrics::record_unauthorized();
    })?;

    if verified != user_id {
        tracing::warn!(user_id = %user_id, token_user = %verified, "Token does not match user_id");
        WsConnectionMetrics::record_unauthorized();
        return Err(AppError::Auth("Token does not match user_id".to_string()));
    }

    Ok(verified)
}

/// Handle an established WebSocket connection
#[tracing::instrument(
    name = "ws.connection",
    skip_all,
    fields(user_id = %user_id)
)]
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    user_id: String,
    product_id: Option<String>,
) {
    let connection_start = Instant::now();

    let (tx, rx) = mpsc::channel::<ServerMessage>(state.settings.websocket.channel_buffer.max(1));
    let session = Arc::new(Session::new(user_id, product_id, tx));

    if let Err(e) = state.hub.register(session.clone()).await {
        tracing::error!(error = %e, "Could not register session");
        return;
    }
    WsConnectionMetrics::record_opened();

    tracing::info!(
        session_id = %session.id,
        user_id = %session.user_id,
        "WebSocket connection established"
    );

    let (ws_sender, ws_receiver) = socket.split();

    // Writer: moves queued frames onto the socket until the session closes
    let send_task = tokio::spawn(write_loop(ws_sender, rx, session.clone()));

    read_loop(ws_receiver, &session).await;

    // A stale unregister (after being superseded) is ignored by the hub
    if let Err(e) = state.hub.unregister(session.clone()).await {
        tracing::debug!(error = %e, "Hub stopped before unregister");
    }
    session.close();
    let _ = send_task.await;

    let duration = connection_start.elapsed().as_secs_f64();
    WsConnectionMetrics::record_closed(duration);

    tracing::info!(
        session_id = %session.id,
        user_id = %session.user_id,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Read inbound frames until the peer goes away, a frame fails to decode,
/// or the session is closed from elsewhere.
pub async fn read_loop<S, E>(mut stream: S, session: &Session)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let closed = session.closed();
    tokio::pin!(closed);

    loop {
        let next = tokio::select! {
            _ = &mut closed => {
                tracing::debug!(session_id = %session.id, "Session closed by hub");
                break;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(msg)) => {
                if !process_message(msg, session).await {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(session_id = %session.id, error = %e, "WebSocket receive error");
                break;
            }
            None => break,
        }
    }
}

/// Apply one inbound frame. Returns false if the connection should be closed.
pub async fn process_message(msg: Message, session: &Session) -> bool {
    let decoded = match &msg {
        Message::Text(text) => ClientMessage::from_slice(text.as_str().as_bytes()),
        Message::Binary(bytes) => ClientMessage::from_slice(bytes),
        Message::Ping(_) | Message::Pong(_) => return true,
        Message::Close(_) => {
            tracing::debug!(session_id = %session.id, "Received close frame");
            return false;
        }
    };

    match decoded {
        Ok(ClientMessage::UpdateView { product_id }) => {
            session.set_viewing_product(product_id).await;
            true
        }
        Err(e) => {
            tracing::warn!(
                session_id = %session.id,
                user_id = %session.user_id,
                error = %e,
                "Failed to decode client frame, closing connection"
            );
            false
        }
    }
}

async fn write_loop<S>(mut sink: S, mut rx: mpsc::Receiver<ServerMessage>, session: Arc<Session>)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let closed = session.closed();
    tokio::pin!(closed);

    loop {
        let msg = tokio::select! {
            _ = &mut closed => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let text = match msg.to_json() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(session_id = %session.id, error = %e, "WebSocket write failed");
            session.close();
            break;
        }
    }

    let _ = sink.close().await;
}
