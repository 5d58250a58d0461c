use serde::{Deserialize, Serialize};

use crate::hub::ChatEvent;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// The client opened (or closed, with an empty id) a product conversation.
    #[serde(rename = "update_view")]
    UpdateView {
        #[serde(rename = "productId", default)]
        product_id: Option<String>,
    },
}

impl ClientMessage {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full chat message, rendered inline by a client viewing the conversation.
    #[serde(rename = "message")]
    Message {
        content: String,
        sender: String,
        receiver: String,
        #[serde(rename = "productId")]
        product_id: String,
        m_id: String,
    },
    /// Background badge for a conversation the client is not viewing.
    /// Carries no content or message id.
    #[serde(rename = "notification")]
    Notification {
        #[serde(rename = "productId")]
        product_id: String,
        sender: String,
    },
}

impl ServerMessage {
    pub fn message(event: ChatEvent) -> Self {
        Self::Message {
            content: event.content,
            sender: event.sender_id,
            receiver: event.receiver_id,
            product_id: event.product_id,
            m_id: event.message_id,
        }
    }

    pub fn notification(event: ChatEvent) -> Self {
        Self::Notification {
            product_id: event.product_id,
            sender: event.sender_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Notification { .. } => "notification",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
