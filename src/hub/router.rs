//! Message-vs-notification framing for a single delivery.

use std::time::Duration;

use crate::websocket::ServerMessage;

use super::event::ChatEvent;
use super::session::{DeliveryError, Session};

/// How a chat event is presented to its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Message,
    Notification,
}

/// Result of routing one event to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(FrameKind),
    Failed(DeliveryError),
}

/// A receiver gets the full message only while viewing that exact,
/// non-empty product conversation.
pub fn classify(viewing_product: Option<&str>, event: &ChatEvent) -> FrameKind {
    match viewing_product {
        Some(viewing) if !viewing.is_empty() && viewing == event.product_id => FrameKind::Message,
        _ => FrameKind::Notification,
    }
}

/// Frames and writes chat events. Owned by the hub task.
#[derive(Debug, Clone)]
pub struct DeliveryRouter {
    write_timeout: Duration,
}

impl DeliveryRouter {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }

    pub async fn route(&self, session: &Session, event: ChatEvent) -> DeliveryOutcome {
        let viewing = session.viewing_product().await;
        let kind = classify(viewing.as_deref(), &event);

        let frame = match kind {
            FrameKind::Message => ServerMessage::message(event),
            FrameKind::Notification => ServerMessage::notification(event),
        };

        match session.send(frame, self.write_timeout).await {
            Ok(()) => DeliveryOutcome::Delivered(kind),
            Err(e) => DeliveryOutcome::Failed(e),
        }
    }
}
