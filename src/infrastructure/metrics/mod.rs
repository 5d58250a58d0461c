//! Prometheus metrics for the chat hub.
//!
//! - Presence metrics (active sessions, superseded sessions)
//! - Delivery metrics (frames written by kind, drops by reason)
//! - WebSocket connection lifecycle metrics

mod helpers;

pub use helpers::{encode_metrics, DeliveryMetrics, WsConnectionMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "chat_hub";

lazy_static! {
    // ============================================================================
    // Presence Metrics
    // ============================================================================

    /// Number of sessions currently registered in the hub
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Number of sessions currently registered in the hub"
    ).unwrap();

    /// Sessions closed because the same user connected again
    pub static ref SESSIONS_SUPERSEDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_superseded_total", METRIC_PREFIX),
        "Total sessions closed because a newer connection for the same user registered"
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Frames written to receivers, by kind (message / notification)
    pub static ref FRAMES_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_frames_sent_total", METRIC_PREFIX),
        "Total chat frames written to receiver sessions",
        &["kind"]
    ).unwrap();

    /// Deliveries that did not reach a receiver, by reason (offline / write_failed)
    pub static ref DELIVERIES_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_deliveries_dropped_total", METRIC_PREFIX),
        "Total chat deliveries dropped",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // WebSocket Metrics
    // ============================================================================

    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Rejected handshakes (missing user id, bad token)
    pub static ref WS_HANDSHAKES_REJECTED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_handshakes_rejected_total", METRIC_PREFIX),
        "Total WebSocket handshakes rejected before upgrade",
        &["reason"]
    ).unwrap();

    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]
    ).unwrap();
}
