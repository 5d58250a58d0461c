//! Presence registry - the single owner of the `user_id -> Session` map.
//!
//! All registration, de-registration and delivery requests travel through one
//! bounded command stream and are applied in order by [`Hub::run`]. The map is
//! never touched from any other task, so it needs no lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::{HubConfig, WebSocketConfig};
use crate::metrics::DeliveryMetrics;

use super::event::ChatEvent;
use super::router::{DeliveryOutcome, DeliveryRouter, FrameKind};
use super::session::Session;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("hub is not running")]
    Stopped,
}

/// Requests accepted by the hub task.
pub enum HubCommand {
    Register(Arc<Session>),
    Unregister(Arc<Session>),
    Deliver(ChatEvent),
    ListOnline {
        respond_to: oneshot::Sender<Vec<String>>,
    },
    Stats {
        respond_to: oneshot::Sender<HubStats>,
    },
}

/// Counters maintained by the hub task.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct HubStats {
    pub online_users: usize,
    pub messages_delivered: u64,
    pub notifications_delivered: u64,
    pub dropped_offline: u64,
    pub failed_writes: u64,
    pub sessions_superseded: u64,
}

/// Cloneable front door to the hub task.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.sender.send(command).await.map_err(|_| HubError::Stopped)
    }

    /// Make `session` the live session for its user, closing any previous one.
    pub async fn register(&self, session: Arc<Session>) -> Result<(), HubError> {
        self.submit(HubCommand::Register(session)).await
    }

    /// Remove `session` if it is still the registered session for its user.
    pub async fn unregister(&self, session: Arc<Session>) -> Result<(), HubError> {
        self.submit(HubCommand::Unregister(session)).await
    }

    /// Fire-and-forget delivery. Succeeds once the hub accepted the event,
    /// regardless of whether the receiver is online.
    pub async fn deliver(&self, event: ChatEvent) -> Result<(), HubError> {
        self.submit(HubCommand::Deliver(event)).await
    }

    /// Snapshot of connected user ids, in no particular order.
    pub async fn list_online(&self) -> Result<Vec<String>, HubError> {
        let (respond_to, response) = oneshot::channel();
        self.submit(HubCommand::ListOnline { respond_to }).await?;
        response.await.map_err(|_| HubError::Stopped)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (respond_to, response) = oneshot::channel();
        self.submit(HubCommand::Stats { respond_to }).await?;
        response.await.map_err(|_| HubError::Stopped)
    }
}

/// The coordinating task. Create with [`Hub::new`] and drive with
/// [`Hub::run`] or [`Hub::run_until`] on a spawned task.
pub struct Hub {
    receiver: mpsc::Receiver<HubCommand>,
    sessions: HashMap<String, Arc<Session>>,
    router: DeliveryRouter,
    stats: HubStats,
}

impl Hub {
    pub fn new(hub_config: &HubConfig, ws_config: &WebSocketConfig) -> (Self, HubHandle) {
        let (sender, receiver) = mpsc::channel(hub_config.command_buffer.max(1));
        let router = DeliveryRouter::new(Duration::from_millis(ws_config.write_timeout_ms));

        let hub = Self {
            receiver,
            sessions: HashMap::new(),
            router,
            stats: HubStats::default(),
        };

        (hub, HubHandle { sender })
    }

    /// Process commands until every handle is dropped.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Process commands until every handle is dropped or `shutdown` resolves.
    /// Remaining sessions are closed on exit.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Hub started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Hub received shutdown signal");
                    break;
                }
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        let remaining = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.close();
        }
        DeliveryMetrics::set_active_sessions(0);

        tracing::info!(closed_sessions = remaining, "Hub stopped");
    }

    async fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(session) => self.register(session),
            HubCommand::Unregister(session) => {
                self.remove_session(&session);
            }
            HubCommand::Deliver(event) => self.deliver(event).await,
            HubCommand::ListOnline { respond_to } => {
                // Ignore send error - caller may have given up
                let _ = respond_to.send(self.sessions.keys().cloned().collect());
            }
            HubCommand::Stats { respond_to } => {
                let mut stats = self.stats.clone();
                stats.online_users = self.sessions.len();
                let _ = respond_to.send(stats);
            }
        }
    }

    fn register(&mut self, session: Arc<Session>) {
        let user_id = session.user_id.clone();

        if let Some(previous) = self.sessions.insert(user_id.clone(), session.clone()) {
            if !Arc::ptr_eq(&previous, &session) {
                tracing::info!(
                    user_id = %user_id,
                    previous_session = %previous.id,
                    session_id = %session.id,
                    "Closing previous connection for user"
                );
                previous.close();
                self.stats.sessions_superseded += 1;
                DeliveryMetrics::record_superseded();
            }
        }

        DeliveryMetrics::set_active_sessions(self.sessions.len());
        tracing::info!(
            user_id = %user_id,
            session_id = %session.id,
            total_connections = self.sessions.len(),
            "User connected"
        );
    }

    /// Remove and close `session` only if it is the one currently registered.
    fn remove_session(&mut self, session: &Arc<Session>) -> bool {
        let is_current = self
            .sessions
            .get(&session.user_id)
            .is_some_and(|current| Arc::ptr_eq(current, session));

        if !is_current {
            tracing::debug!(
                user_id = %session.user_id,
                session_id = %session.id,
                "Ignoring unregister for stale session"
            );
            return false;
        }

        self.sessions.remove(&session.user_id);
        session.close();
        DeliveryMetrics::set_active_sessions(self.sessions.len());

        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.id,
            total_connections = self.sessions.len(),
            "User disconnected"
        );
        true
    }

    async fn deliver(&mut self, event: ChatEvent) {
        let Some(session) = self.sessions.get(&event.receiver_id).cloned() else {
            tracing::debug!(
                receiver = %event.receiver_id,
                message_id = %event.message_id,
                "Receiver not connected, message not delivered"
            );
            self.stats.dropped_offline += 1;
            DeliveryMetrics::record_offline_drop();
            return;
        };

        let receiver = event.receiver_id.clone();
        let product_id = event.product_id.clone();

        match self.router.route(&session, event).await {
            DeliveryOutcome::Delivered(FrameKind::Message) => {
                self.stats.messages_delivered += 1;
                DeliveryMetrics::record_message();
                tracing::debug!(receiver = %receiver, product_id = %product_id, "Message delivered");
            }
            DeliveryOutcome::Delivered(FrameKind::Notification) => {
                self.stats.notifications_delivered += 1;
                DeliveryMetrics::record_notification();
                tracing::debug!(receiver = %receiver, product_id = %product_id, "Notification sent");
            }
            DeliveryOutcome::Failed(e) => {
                tracing::warn!(
                    receiver = %receiver,
                    session_id = %session.id,
                    error = %e,
                    "Write to receiver failed, dropping session"
                );
                self.stats.failed_writes += 1;
                DeliveryMetrics::record_write_failure();
                self.remove_session(&session);
            }
        }
    }
}
