//! Backend trait for chat message persistence.
//!
//! The hub itself never stores anything; the send path persists through a
//! [`MessageStore`] first and only then hands the message to the hub.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::hub::ChatEvent;

/// Errors that can occur during message store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Backend is temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A message about to be persisted.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub content: String,
    pub sender: String,
    pub receiver: String,
    pub product_id: String,
}

/// A persisted chat message, as returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub m_id: Uuid,
    pub content: String,
    pub created: DateTime<Utc>,
    pub sender: String,
    pub receiver: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    pub seen: bool,
}

impl StoredMessage {
    pub fn from_new(message: NewMessage) -> Self {
        Self {
            m_id: Uuid::new_v4(),
            content: message.content,
            created: Utc::now(),
            sender: message.sender,
            receiver: message.receiver,
            product_id: message.product_id,
            seen: false,
        }
    }

    /// The delivery request handed to the hub after persistence.
    pub fn to_event(&self) -> ChatEvent {
        ChatEvent {
            message_id: self.m_id.to_string(),
            content: self.content.clone(),
            sender_id: self.sender.clone(),
            receiver_id: self.receiver.clone(),
            product_id: self.product_id.clone(),
        }
    }
}

/// One inbox entry: a conversation in which the caller received messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub sender: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    /// Messages from `sender` the caller has not seen yet
    #[serde(rename = "unseenCount")]
    pub unseen_count: u64,
}

/// Durable storage for chat messages and their "seen" state.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Backend identifier for logging and stats
    fn backend_name(&self) -> &'static str;

    /// Persist a message. The hub is only told about it once this returns `Ok`.
    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError>;

    /// Messages exchanged between two users about one product, oldest first.
    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        product_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Mark every unseen message from `sender` to `receiver` as seen.
    /// Returns the number of messages updated.
    async fn mark_seen(&self, sender: &str, receiver: &str) -> Result<u64, StoreError>;

    /// Conversations in which `receiver` got at least one message, one entry
    /// per sender and product, ordered by user pair then product.
    async fn chats(&self, receiver: &str) -> Result<Vec<ChatSummary>, StoreError>;
}
