//! API layer - HTTP endpoint handlers.

mod health;
mod identity;
mod messages;
mod metrics;
mod presence;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use identity::{CallerId, USER_ID_HEADER};
pub use messages::{
    get_messages, list_chats, mark_messages_seen, send_message, MarkSeenResponse, SendMessageRequest,
};
pub use metrics::prometheus_metrics;
pub use presence::{online_users, OnlineUsersResponse};
pub use routes::api_routes;
