//! Per-connection session state

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use crate::websocket::ServerMessage;

/// Why a frame could not be written to a session's transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("session already closed")]
    Closed,

    #[error("transport writer is gone")]
    TransportGone,

    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}

/// One connected user: identity, viewing context and outbound transport.
///
/// The transport is the sending half of the connection's writer queue. It is
/// closed at most once; later calls to [`Session::close`] are no-ops.
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
    /// `None` means the client has no conversation open
    viewing_product: RwLock<Option<String>>,
    sender: mpsc::Sender<ServerMessage>,
    closed: AtomicBool,
    close_signal: watch::Sender<bool>,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        viewing_product: Option<String>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        let (close_signal, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            connected_at: Utc::now(),
            viewing_product: RwLock::new(normalize_product(viewing_product)),
            sender,
            closed: AtomicBool::new(false),
            close_signal,
        }
    }

    pub async fn viewing_product(&self) -> Option<String> {
        self.viewing_product.read().await.clone()
    }

    /// Replace the viewing context. An empty id clears it.
    pub async fn set_viewing_product(&self, product_id: Option<String>) {
        let product_id = normalize_product(product_id);
        tracing::debug!(
            session_id = %self.id,
            user_id = %self.user_id,
            product_id = ?product_id,
            "Viewing context updated"
        );
        *self.viewing_product.write().await = product_id;
    }

    /// Queue a frame for the connection's writer, waiting at most
    /// `write_timeout` for buffer space.
    pub async fn send(
        &self,
        message: ServerMessage,
        write_timeout: Duration,
    ) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }

        match tokio::time::timeout(write_timeout, self.sender.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeliveryError::TransportGone),
            Err(_) => Err(DeliveryError::Timeout(write_timeout)),
        }
    }

    /// Close the transport. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.close_signal.send_replace(true);
        tracing::debug!(session_id = %self.id, user_id = %self.user_id, "Session transport closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the session has been closed by any party.
    pub async fn closed(&self) {
        let mut signal = self.close_signal.subscribe();
        while !*signal.borrow_and_update() {
            if signal.changed().await.is_err() {
                return;
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn normalize_product(product_id: Option<String>) -> Option<String> {
    product_id.filter(|p| !p.is_empty())
}
