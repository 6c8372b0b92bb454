//! Unit tests for `WsManager`.
//!
//! These exercise the connection manager directly, without performing any
//! HTTP upgrades.

use axum::extract::ws::Message;
use gridline_api::ws::WsManager;

fn text(msg: Message) -> String {
    match msg {
        Message::Text(text) => text.as_str().to_string(),
        other => panic!("Expected text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_and_remove_track_count() {
    let manager = WsManager::new();

    let _rx = manager.add("conn-1".to_string(), 1, 10).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn page_connections_filter_by_page() {
    let manager = WsManager::new();
    let _a = manager.add("a".to_string(), 1, 10).await;
    let _b = manager.add("b".to_string(), 2, 10).await;
    let _c = manager.add("c".to_string(), 1, 20).await;

    let mut on_page = manager.page_connections(10).await;
    on_page.sort();
    assert_eq!(on_page, vec!["a", "b"]);
    assert_eq!(manager.page_connections(20).await, vec!["c"]);
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_reaches_only_that_connection() {
    let manager = WsManager::new();
    let mut rx_a = manager.add("a".to_string(), 1, 10).await;
    let mut rx_b = manager.add("b".to_string(), 1, 10).await;

    assert!(manager.send_to("a", Message::Text("ack".into())).await);
    assert!(!manager.send_to("missing", Message::Text("ack".into())).await);

    assert_eq!(text(rx_a.recv().await.unwrap()), "ack");
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn broadcast_to_page_skips_sender_and_other_pages() {
    let manager = WsManager::new();
    let mut sender = manager.add("sender".to_string(), 1, 10).await;
    let mut peer = manager.add("peer".to_string(), 2, 10).await;
    let mut elsewhere = manager.add("elsewhere".to_string(), 3, 20).await;

    let reached = manager
        .broadcast_to_page(10, Some("sender"), Message::Text("changed".into()))
        .await;

    assert_eq!(reached, 1);
    assert_eq!(text(peer.recv().await.unwrap()), "changed");
    assert!(sender.try_recv().is_err());
    assert!(elsewhere.try_recv().is_err());
}

#[tokio::test]
async fn broadcast_skips_closed_channels() {
    let manager = WsManager::new();
    let rx = manager.add("gone".to_string(), 1, 10).await;
    drop(rx);
    let mut live = manager.add("live".to_string(), 1, 10).await;

    let reached = manager
        .broadcast_to_page(10, None, Message::Text("changed".into()))
        .await;

    assert_eq!(reached, 1);
    assert_eq!(text(live.recv().await.unwrap()), "changed");
}

// ---------------------------------------------------------------------------
// Shutdown and heartbeat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string(), 1, 10).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
}

#[tokio::test]
async fn ping_all_sends_ping() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string(), 1, 10).await;

    manager.ping_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
}
