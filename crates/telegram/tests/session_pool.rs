//! Pool lifecycle and update-to-event translation.

mod common;

use std::time::Duration;

use common::{authenticated_session, user, Harness};
use tgw_core::types::DbId;
use tgw_telegram::upstream::{Entities, Peer, RawMessage, RawUserStatus, Update};

fn incoming(id: i32, from: i64, text: &str, out: bool) -> Update {
    Update::NewMessage {
        message: RawMessage {
            id,
            peer: Peer::User(from),
            from: Some(Peer::User(from)),
            text: text.to_string(),
            date: 1_700_000_000,
            out,
            reply_to: None,
            media: None,
            forwarded: false,
        },
        entities: Entities::with_users([user(from, "bob")]),
    }
}

#[tokio::test]
async fn updates_become_events_and_stream_end_reports_error() {
    let mut h = Harness::new();
    let session = authenticated_session(DbId::new_v4());
    let id = session.id;
    h.store.insert(session.clone());

    let feed = h.upstream.update_feed();
    h.pool.start_session(&session).await.unwrap();

    let started = h.next_event().await;
    assert_eq!(started.event_type, "session.started");
    assert_eq!(started.data["session_name"], "Work");
    assert_eq!(started.data["telegram_id"], 777);

    feed.send(incoming(1, 5, "own message", true)).unwrap();
    feed.send(incoming(2, 5, "hello", false)).unwrap();
    feed.send(Update::UserTyping { user_id: 5 }).unwrap();
    feed.send(Update::UserStatus {
        user_id: 5,
        status: RawUserStatus::Recently,
    })
    .unwrap();
    feed.send(Update::UserStatus {
        user_id: 5,
        status: RawUserStatus::Online,
    })
    .unwrap();

    let message = h.next_event().await;
    assert_eq!(message.event_type, "message.new");
    assert_eq!(message.session_id, id);
    assert_eq!(message.data["message_id"], 2);
    assert_eq!(message.data["chat_id"], 5);
    assert_eq!(message.data["text"], "hello");

    let typing = h.next_event().await;
    assert_eq!(typing.event_type, "user.typing");
    assert_eq!(typing.data["chat_id"], 5);
    assert_eq!(typing.data["action"], "typing");

    let online = h.next_event().await;
    assert_eq!(online.event_type, "user.online");

    drop(feed);
    let error = h.next_event().await;
    assert_eq!(error.event_type, "session.error");
    assert!(error.data["error"]
        .as_str()
        .is_some_and(|e| e.contains("connection reset")));

    let mut removed = false;
    for _ in 0..100 {
        if !h.pool.is_active(id).await {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(removed, "failed entry should leave the pool");
}

#[tokio::test]
async fn clean_stream_end_leaves_the_pool_without_an_error_event() {
    let mut h = Harness::new();
    h.upstream.script(|s| s.updates_end_cleanly = true);
    let session = authenticated_session(DbId::new_v4());
    let id = session.id;
    h.store.insert(session.clone());

    let feed = h.upstream.update_feed();
    h.pool.start_session(&session).await.unwrap();
    assert_eq!(h.next_event().await.event_type, "session.started");

    drop(feed);
    let mut removed = false;
    for _ in 0..100 {
        if !h.pool.is_active(id).await {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(removed, "ended entry should leave the pool");
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn stop_is_idempotent_and_silences_the_session() {
    let mut h = Harness::new();
    let session = authenticated_session(DbId::new_v4());
    let id = session.id;
    h.store.insert(session.clone());

    let feed = h.upstream.update_feed();
    h.pool.start_session(&session).await.unwrap();
    assert!(h.pool.stop_session(id).await);
    assert!(!h.pool.stop_session(id).await);

    let _ = feed.send(incoming(3, 5, "late", false));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let types: Vec<_> = h.drain_events().into_iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec!["session.started", "session.stopped"]);
    assert_eq!(h.pool.active_count().await, 0);
}

#[tokio::test]
async fn starting_a_running_session_is_a_no_op() {
    let mut h = Harness::new();
    let session = authenticated_session(DbId::new_v4());
    h.store.insert(session.clone());

    h.pool.start_session(&session).await.unwrap();
    h.pool.start_session(&session).await.unwrap();

    assert_eq!(h.pool.active_count().await, 1);
    assert_eq!(h.drain_events().len(), 1);
    h.pool.shutdown(Duration::from_secs(1)).await;
    assert_eq!(h.pool.active_count().await, 0);
}

#[tokio::test]
async fn startup_loads_only_eligible_sessions_with_webhooks() {
    let h = Harness::new();
    let owner = DbId::new_v4();

    let mut with_hook = authenticated_session(owner);
    with_hook.phone_number = "+15550101".into();
    let mut without_hook = authenticated_session(owner);
    without_hook.phone_number = "+15550102".into();
    let mut inactive = authenticated_session(owner);
    inactive.phone_number = "+15550103".into();
    inactive.is_active = false;

    for s in [&with_hook, &without_hook, &inactive] {
        h.store.insert(s.clone());
    }
    h.store.insert_webhook(with_hook.id, "https://hooks.example.com/a");
    h.store.insert_webhook(inactive.id, "https://hooks.example.com/c");

    let started = h.pool.start_all_active().await.unwrap();

    assert_eq!(started, 1);
    assert!(h.pool.is_active(with_hook.id).await);
    assert!(!h.pool.is_active(without_hook.id).await);
    assert!(!h.pool.is_active(inactive.id).await);
}
