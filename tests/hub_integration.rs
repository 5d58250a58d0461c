//! Hub integration tests
//!
//! Drive a real hub task through its handle with in-process sessions.
//! No sockets are opened; each session's writer queue is read directly.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use marketplace_chat_hub::config::{HubConfig, WebSocketConfig};
use marketplace_chat_hub::hub::{ChatEvent, Hub, HubHandle, Session};
use marketplace_chat_hub::websocket::{process_message, ServerMessage};

struct TestHub {
    handle: HubHandle,
    task: JoinHandle<()>,
}

fn start_hub() -> TestHub {
    let ws_config = WebSocketConfig {
        channel_buffer: 8,
        write_timeout_ms: 100,
    };
    let (hub, handle) = Hub::new(&HubConfig::default(), &ws_config);
    let task = tokio::spawn(hub.run());
    TestHub { handle, task }
}

fn connect(user_id: &str, product_id: Option<&str>) -> (Arc<Session>, mpsc::Receiver<ServerMessage>) {
    let (tx, rx) = mpsc::channel(8);
    let session = Session::new(user_id, product_id.map(str::to_string), tx);
    (Arc::new(session), rx)
}

fn event(id: &str, sender: &str, receiver: &str, product_id: &str, content: &str) -> ChatEvent {
    ChatEvent {
        message_id: id.to_string(),
        content: content.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        product_id: product_id.to_string(),
    }
}

async fn online(handle: &HubHandle) -> Vec<String> {
    let mut users = handle.list_online().await.unwrap();
    users.sort();
    users
}

#[tokio::test]
async fn test_new_session_supersedes_previous() {
    let hub = start_hub();

    let (first, _rx1) = connect("u1", None);
    let (second, mut rx2) = connect("u1", Some("p1"));

    hub.handle.register(first.clone()).await.unwrap();
    hub.handle.register(second.clone()).await.unwrap();

    assert_eq!(online(&hub.handle).await, vec!["u1"]);
    assert!(first.is_closed());
    assert!(!second.is_closed());

    // Deliveries go to the newest session
    hub.handle
        .deliver(event("m1", "u2", "u1", "p1", "hello"))
        .await
        .unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(1), rx2.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame.kind(), "message");

    let stats = hub.handle.stats().await.unwrap();
    assert_eq!(stats.sessions_superseded, 1);
}

#[tokio::test]
async fn test_stale_unregister_keeps_current_session() {
    let hub = start_hub();

    let (old, _rx_old) = connect("u1", None);
    let (current, _rx_current) = connect("u1", None);

    hub.handle.register(old.clone()).await.unwrap();
    hub.handle.register(current.clone()).await.unwrap();

    // The superseded connection's own teardown arrives late
    hub.handle.unregister(old).await.unwrap();

    assert_eq!(online(&hub.handle).await, vec!["u1"]);
    assert!(!current.is_closed());

    hub.handle.unregister(current.clone()).await.unwrap();
    assert!(online(&hub.handle).await.is_empty());
    assert!(current.is_closed());
}

#[tokio::test]
async fn test_delivery_classification_follows_viewing_context() {
    let hub = start_hub();

    let (seller, mut rx) = connect("seller", Some("p1"));
    hub.handle.register(seller.clone()).await.unwrap();

    hub.handle
        .deliver(event("m1", "buyer", "seller", "p1", "is it available?"))
        .await
        .unwrap();
    hub.handle
        .deliver(event("m2", "buyer", "seller", "p2", "what about this one?"))
        .await
        .unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        ServerMessage::Message {
            content: "is it available?".to_string(),
            sender: "buyer".to_string(),
            receiver: "seller".to_string(),
            product_id: "p1".to_string(),
            m_id: "m1".to_string(),
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        ServerMessage::Notification {
            product_id: "p2".to_string(),
            sender: "buyer".to_string(),
        }
    );

    // Leaving the conversation turns the next message into a notification
    seller.set_viewing_product(None).await;
    hub.handle
        .deliver(event("m3", "buyer", "seller", "p1", "hello?"))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap().kind(), "notification");

    let stats = hub.handle.stats().await.unwrap();
    assert_eq!(stats.messages_delivered, 1);
    assert_eq!(stats.notifications_delivered, 2);
}

#[tokio::test]
async fn test_offline_receiver_is_dropped_without_writes() {
    let hub = start_hub();

    let (bystander, mut rx) = connect("u3", Some("p1"));
    hub.handle.register(bystander).await.unwrap();

    hub.handle
        .deliver(event("m1", "u1", "u2", "p1", "anyone there?"))
        .await
        .unwrap();

    let stats = hub.handle.stats().await.unwrap();
    assert_eq!(stats.dropped_offline, 1);
    assert_eq!(stats.messages_delivered + stats.notifications_delivered, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let hub = start_hub();

    let (session, _rx) = connect("u1", None);
    hub.handle.register(session.clone()).await.unwrap();

    // Reader-side teardown and a hub-side close racing each other
    assert!(session.close());
    hub.handle.unregister(session.clone()).await.unwrap();
    hub.handle.unregister(session.clone()).await.unwrap();
    assert!(!session.close());

    assert!(online(&hub.handle).await.is_empty());
}

#[tokio::test]
async fn test_online_enumeration() {
    let hub = start_hub();

    let (a, _rx_a) = connect("A", None);
    let (b, _rx_b) = connect("B", None);

    hub.handle.register(a.clone()).await.unwrap();
    hub.handle.register(b).await.unwrap();
    assert_eq!(online(&hub.handle).await, vec!["A", "B"]);

    hub.handle.unregister(a).await.unwrap();
    assert_eq!(online(&hub.handle).await, vec!["B"]);
}

#[tokio::test]
async fn test_buyer_seller_conversation() {
    let hub = start_hub();

    // U1 has P1 open, U2 is on the product list
    let (u1, mut rx1) = connect("U1", Some("P1"));
    let (u2, mut rx2) = connect("U2", None);
    hub.handle.register(u1.clone()).await.unwrap();
    hub.handle.register(u2.clone()).await.unwrap();

    hub.handle
        .deliver(event("m-1", "U2", "U1", "P1", "Still for sale?"))
        .await
        .unwrap();
    let frame = rx1.recv().await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "message");
    assert_eq!(json["content"], "Still for sale?");
    assert_eq!(json["m_id"], "m-1");

    hub.handle
        .deliver(event("m-2", "U2", "U1", "P2", "Or this one?"))
        .await
        .unwrap();
    let frame = rx1.recv().await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "notification");
    assert_eq!(json["productId"], "P2");
    assert_eq!(json["sender"], "U2");
    assert!(json.get("content").is_none());
    assert!(json.get("m_id").is_none());

    // Nothing was addressed to U2
    assert!(rx2.try_recv().is_err());
}

#[tokio::test]
async fn test_update_view_frame_changes_classification() {
    let hub = start_hub();

    let (u1, mut rx) = connect("U1", None);
    hub.handle.register(u1.clone()).await.unwrap();

    let keep_open = process_message(
        Message::Text(r#"{"type":"update_view","productId":"P9"}"#.into()),
        &u1,
    )
    .await;
    assert!(keep_open);

    hub.handle
        .deliver(event("m1", "U2", "U1", "P9", "hi"))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap().kind(), "message");
}

#[tokio::test]
async fn test_failed_write_unregisters_receiver() {
    let hub = start_hub();

    let (u1, rx) = connect("U1", Some("P1"));
    hub.handle.register(u1.clone()).await.unwrap();

    // Writer went away without unregistering
    drop(rx);

    hub.handle
        .deliver(event("m1", "U2", "U1", "P1", "hi"))
        .await
        .unwrap();

    assert!(online(&hub.handle).await.is_empty());
    assert!(u1.is_closed());
    assert_eq!(hub.handle.stats().await.unwrap().failed_writes, 1);
}

#[tokio::test]
async fn test_hub_stops_when_handles_dropped() {
    let hub = start_hub();

    let (u1, _rx) = connect("U1", None);
    hub.handle.register(u1.clone()).await.unwrap();
    // Round trip so the registration is applied before shutdown
    hub.handle.stats().await.unwrap();

    drop(hub.handle);
    tokio::time::timeout(Duration::from_secs(1), hub.task)
        .await
        .unwrap()
        .unwrap();

    assert!(u1.is_closed());
}

#[tokio::test]
async fn test_handle_reports_stopped_hub() {
    let (hub, handle) = Hub::new(&HubConfig::default(), &WebSocketConfig::default());
    let task = tokio::spawn(hub.run_until(async {}));
    task.await.unwrap();

    let (session, _rx) = connect("U1", None);
    tokio_test::assert_err!(handle.register(session).await);
    tokio_test::assert_err!(handle.list_online().await);
    tokio_test::assert_err!(
        handle
            .deliver(event("m1", "U2", "U1", "P1", "hi"))
            .await
    );
}
