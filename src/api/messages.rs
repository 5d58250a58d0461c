//! Chat message endpoints: send, inbox, read a conversation, mark as seen.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::store::{ChatSummary, NewMessage, StoredMessage};

use super::identity::CallerId;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub receiver: String,
    #[serde(rename = "productId")]
    pub product_id: String,
}

impl SendMessageRequest {
    fn validate(&self, sender: &str) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("content must not be empty".to_string()));
        }
        if self.receiver.is_empty() {
            return Err(AppError::Validation("receiver is required".to_string()));
        }
        if self.product_id.is_empty() {
            return Err(AppError::Validation("productId is required".to_string()));
        }
        if self.receiver == sender {
            return Err(AppError::Validation("cannot send a message to yourself".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub product_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkSeenQuery {
    pub sender_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkSeenResponse {
    pub updated: u64,
}

/// POST /api/v1/messages
///
/// Persists first; the hub only sees the message once storage acknowledged
/// it. Delivery is best effort and never fails the request.
#[tracing::instrument(
    name = "http.send_message",
    skip_all,
    fields(sender = %sender, receiver = %request.receiver, product_id = %request.product_id)
)]
pub async fn send_message(
    State(state): State<AppState>,
    CallerId(sender): CallerId,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<StoredMessage>> {
    request.validate(&sender)?;

    let stored = state
        .store
        .persist(NewMessage {
            content: request.content,
            sender,
            receiver: request.receiver,
            product_id: request.product_id,
        })
        .await?;

    if let Err(e) = state.hub.deliver(stored.to_event()).await {
        tracing::warn!(
            message_id = %stored.m_id,
            error = %e,
            "Message persisted but hub unavailable for delivery"
        );
    }

    Ok(Json(stored))
}

/// GET /api/v1/chats
///
/// The caller's inbox with an unseen count per conversation.
pub async fn list_chats(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
) -> Result<Json<Vec<ChatSummary>>> {
    let chats = state.store.chats(&caller).await?;
    Ok(Json(chats))
}

/// GET /api/v1/messages?product_id=..&user_id=..
pub async fn get_messages(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<StoredMessage>>> {
    let product_id = required(query.product_id, "product_id")?;
    let other_user = required(query.user_id, "user_id")?;

    let messages = state
        .store
        .conversation(&caller, &other_user, &product_id)
        .await?;

    Ok(Json(messages))
}

/// PUT /api/v1/messages/seen?sender_id=..
pub async fn mark_messages_seen(
    State(state): State<AppState>,
    CallerId(receiver): CallerId,
    Query(query): Query<MarkSeenQuery>,
) -> Result<Json<MarkSeenResponse>> {
    let sender = required(query.sender_id, "sender_id")?;
    let updated = state.store.mark_seen(&sender, &receiver).await?;

    tracing::debug!(sender = %sender, receiver = %receiver, updated, "Messages marked as seen");
    Ok(Json(MarkSeenResponse { updated }))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing {} parameter", name)))
}
