use serde::{Deserialize, Serialize};

/// One persisted chat message on its way to the receiver.
///
/// Built by the send path only after the message store acknowledged the
/// write; the hub consumes it once and never re-queues it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub message_id: String,
    pub content: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub product_id: String,
}
