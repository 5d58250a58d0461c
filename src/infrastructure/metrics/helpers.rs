//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DELIVERIES_DROPPED_TOTAL, FRAMES_SENT_TOTAL, SESSIONS_ACTIVE, SESSIONS_SUPERSEDED_TOTAL,
    WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION, WS_HANDSHAKES_REJECTED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording hub delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_message() {
        FRAMES_SENT_TOTAL.with_label_values(&["message"]).inc();
    }

    pub fn record_notification() {
        FRAMES_SENT_TOTAL.with_label_values(&["notification"]).inc();
    }

    /// Receiver had no registered session
    pub fn record_offline_drop() {
        DELIVERIES_DROPPED_TOTAL.with_label_values(&["offline"]).inc();
    }

    /// Receiver session was registered but the write failed
    pub fn record_write_failure() {
        DELIVERIES_DROPPED_TOTAL.with_label_values(&["write_failed"]).inc();
    }

    pub fn record_superseded() {
        SESSIONS_SUPERSEDED_TOTAL.inc();
    }

    pub fn set_active_sessions(count: usize) {
        SESSIONS_ACTIVE.set(count as i64);
    }
}

/// Helper struct for recording WebSocket connection metrics
pub struct WsConnectionMetrics;

impl WsConnectionMetrics {
    pub fn record_opened() {
        WS_CONNECTIONS_OPENED.inc();
    }

    pub fn record_closed(duration_secs: f64) {
        WS_CONNECTIONS_CLOSED.inc();
        WS_CONNECTION_DURATION.observe(duration_secs);
    }

    pub fn record_missing_user() {
        WS_HANDSHAKES_REJECTED.with_label_values(&["missing_user_id"]).inc();
    }

    pub fn record_unauthorized() {
        WS_HANDSHAKES_REJECTED.with_label_values(&["unauthorized"]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_recorded_metrics() {
        DeliveryMetrics::record_message();
        DeliveryMetrics::record_offline_drop();
        WsConnectionMetrics::record_opened();

        let output = encode_metrics().unwrap();
        assert!(output.contains("chat_hub_frames_sent_total"));
        assert!(output.contains("chat_hub_deliveries_dropped_total"));
        assert!(output.contains("chat_hub_ws_connections_opened_total"));
    }
}
