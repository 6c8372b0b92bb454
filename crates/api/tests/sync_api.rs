//! The sync WebSocket end to end: a real server on an ephemeral port and
//! the `gridline-sync` client.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

use gridline_core::grid::GridRect;
use gridline_core::node::{NodeSnapshot, PartialNodeUpdate, Props};
use gridline_core::wire::{parse_server_event, ClientEvent, InsertBatch, ServerEvent, WirePayload};
use gridline_db::models::app::CreateApp;
use gridline_db::models::page::{CreatePage, Page};
use gridline_db::repositories::{AppRepo, NodeRepo, PageRepo};
use gridline_sync::{SyncChannel, SyncConfig, SyncError};

const WAIT: Duration = Duration::from_secs(5);

async fn new_page(pool: &PgPool) -> Page {
    let app = AppRepo::create(pool, &CreateApp { name: "Shop".into() })
        .await
        .unwrap();
    PageRepo::create(
        pool,
        &CreatePage {
            app_id: app.id,
            name: "Home".into(),
        },
    )
    .await
    .unwrap()
}

fn insert_text(id: &str, row: i32) -> WirePayload {
    WirePayload::Insert(InsertBatch {
        nodes: vec![NodeSnapshot {
            id: id.into(),
            node_type: "text".into(),
            parent_id: "canvas".into(),
            rect: GridRect::new(0, row, 4, 1),
            is_canvas: false,
            column_width: None,
            props: Props::new(),
        }],
        side_effects: vec![],
    })
}

/// Receive until `matches` accepts an event.
async fn next_matching(
    events: &mut broadcast::Receiver<ServerEvent>,
    matches: impl Fn(&ServerEvent) -> bool,
) -> ServerEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.unwrap();
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for server event")
}

/// Read the next text frame from a raw socket as a server event.
async fn next_raw_event<S>(ws: &mut S) -> ServerEvent
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return parse_server_event(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("Socket ended before a server event: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for server frame")
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_token_authenticates(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, state) = common::spawn_server(pool).await;

    let channel = SyncChannel::connect(SyncConfig::new(
        common::sync_url(addr, page.id),
        common::test_token(),
    ))
    .await
    .unwrap();

    assert_eq!(channel.user_id(), common::TEST_USER_ID);
    assert_eq!(state.ws_manager.page_connections(page.id).await.len(), 1);
    channel.close().await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_token_is_rejected(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, state) = common::spawn_server(pool).await;

    let result = SyncChannel::connect(SyncConfig::new(
        common::sync_url(addr, page.id),
        "not-a-token",
    ))
    .await;

    assert_matches!(result, Err(SyncError::AuthRejected(_)));
    assert_eq!(state.ws_manager.connection_count().await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mutation_before_auth_is_rejected_and_not_applied(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, _state) = common::spawn_server(pool.clone()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(common::sync_url(addr, page.id))
        .await
        .unwrap();
    let frame = serde_json::to_string(&ClientEvent::from(insert_text("sneaky", 0))).unwrap();
    ws.send(Message::Text(frame)).await.unwrap();

    assert_matches!(next_raw_event(&mut ws).await, ServerEvent::AuthFailed { .. });
    assert_eq!(NodeRepo::count_by_page(&pool, page.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn silent_connection_times_out(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, _state) = common::spawn_server(pool).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(common::sync_url(addr, page.id))
        .await
        .unwrap();

    assert_matches!(
        next_raw_event(&mut ws).await,
        ServerEvent::AuthFailed { message } if message.contains("timed out")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_page_refuses_upgrade(pool: PgPool) {
    let (addr, _state) = common::spawn_server(pool).await;

    let result = tokio_tungstenite::connect_async(common::sync_url(addr, 999_999)).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn batches_are_persisted_and_acked(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, state) = common::spawn_server(pool).await;

    let channel = SyncChannel::connect(SyncConfig::new(
        common::sync_url(addr, page.id),
        common::test_token(),
    ))
    .await
    .unwrap();
    let mut events = channel.subscribe();

    channel.send_payload(insert_text("title", 0)).unwrap();
    channel
        .send_payload(WirePayload::Update(vec![PartialNodeUpdate::rect(
            "title",
            GridRect::new(2, 0, 6, 1),
        )]))
        .unwrap();

    let first = next_matching(&mut events, |e| matches!(e, ServerEvent::Ack { .. })).await;
    assert_matches!(first, ServerEvent::Ack { event, count: 1 } if event == "insert");
    let second = next_matching(&mut events, |e| matches!(e, ServerEvent::Ack { .. })).await;
    assert_matches!(second, ServerEvent::Ack { event, count: 1 } if event == "update");

    let tree = state.trees().get_tree(page.id).await.unwrap();
    assert_eq!(tree["title"].node.rect, GridRect::new(2, 0, 6, 1));
    channel.close().await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_batch_reports_error_and_channel_continues(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, state) = common::spawn_server(pool).await;

    let channel = SyncChannel::connect(SyncConfig::new(
        common::sync_url(addr, page.id),
        common::test_token(),
    ))
    .await
    .unwrap();
    let mut events = channel.subscribe();

    channel
        .send_payload(WirePayload::Update(vec![PartialNodeUpdate::rect(
            "ghost",
            GridRect::new(0, 0, 1, 1),
        )]))
        .unwrap();
    let error = next_matching(&mut events, |e| matches!(e, ServerEvent::Error { .. })).await;
    assert_matches!(error, ServerEvent::Error { event, code, .. } if event == "update" && code == "NOT_FOUND");

    channel.send_payload(insert_text("title", 0)).unwrap();
    next_matching(&mut events, |e| matches!(e, ServerEvent::Ack { .. })).await;

    let tree = state.trees().get_tree(page.id).await.unwrap();
    assert!(tree.contains_key("title"));
    channel.close().await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_connections_on_the_page_see_changes(pool: PgPool) {
    let page = new_page(&pool).await;
    let (addr, _state) = common::spawn_server(pool).await;
    let url = common::sync_url(addr, page.id);

    let author = SyncChannel::connect(SyncConfig::new(url.clone(), common::test_token()))
        .await
        .unwrap();
    let viewer = SyncChannel::connect(SyncConfig::new(url, common::test_token()))
        .await
        .unwrap();
    let mut author_events = author.subscribe();
    let mut viewer_events = viewer.subscribe();

    author.send_payload(insert_text("title", 0)).unwrap();

    let changed = next_matching(&mut viewer_events, |e| {
        matches!(e, ServerEvent::TreeChanged(_))
    })
    .await;
    assert_eq!(changed, ServerEvent::TreeChanged(insert_text("title", 0)));

    // The author gets an ack, not its own change back.
    let ack = next_matching(&mut author_events, |_| true).await;
    assert_matches!(ack, ServerEvent::Ack { .. });

    author.close().await;
    viewer.close().await;
}
