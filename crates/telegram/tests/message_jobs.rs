//! Message job queue: validation, scheduling, execution, and bulk sends.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{authenticated_session, user, Harness};
use tgw_core::messages::{MessageStatus, MessageType, MAX_SEND_DELAY_MS};
use tgw_core::types::DbId;
use tgw_telegram::jobs::{BulkSpec, MessageJob, SendSpec};
use tgw_telegram::upstream::{Entities, InputPeer, Peer, ResolvedRaw, UpstreamError};
use tgw_telegram::TelegramError;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup() -> (Harness, DbId, DbId) {
    let h = Harness::new();
    let owner = DbId::new_v4();
    let session = authenticated_session(owner);
    let id = session.id;
    h.store.insert(session);
    h.upstream.script(|s| {
        s.usernames.insert(
            "alice".into(),
            ResolvedRaw {
                peer: Peer::User(42),
                entities: Entities::with_users([user(42, "alice")]),
            },
        );
    });
    (h, owner, id)
}

fn text_to(to: &str, text: &str) -> SendSpec {
    SendSpec {
        to: to.into(),
        text: text.into(),
        ..SendSpec::default()
    }
}

/// Poll a job until it reaches a terminal status.
async fn settle(h: &Harness, owner: DbId, job_id: Uuid) -> MessageJob {
    for _ in 0..200 {
        let job = h.service.job_status(owner, job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn text_message_is_resolved_and_sent() {
    let (h, owner, id) = setup();

    let receipt = h
        .service
        .send_message(owner, id, text_to("@alice", "hi"))
        .await
        .unwrap();
    assert_eq!(receipt.status, MessageStatus::Pending);
    assert_eq!(receipt.message, "message queued");

    let job = settle(&h, owner, receipt.job_id).await;
    assert_eq!(job.status, MessageStatus::Sent);
    assert!(job.sent_at.is_some());
    assert_eq!(
        h.upstream.sent_texts(),
        vec![(
            InputPeer::User {
                id: 42,
                access_hash: 420
            },
            "hi".to_string()
        )]
    );
}

#[tokio::test]
async fn phone_recipient_is_imported_as_contact() {
    let (h, owner, id) = setup();
    h.upstream.script(|s| {
        s.imported.insert("+15550199".into(), user(55, ""));
    });

    let receipt = h
        .service
        .send_message(owner, id, text_to("+15550199", "hey"))
        .await
        .unwrap();
    let job = settle(&h, owner, receipt.job_id).await;

    assert_eq!(job.status, MessageStatus::Sent);
    assert_eq!(h.upstream.count("import_contact"), 1);
    assert_matches!(h.upstream.sent_texts()[0].0, InputPeer::User { id: 55, .. });
}

#[tokio::test]
async fn upstream_failure_marks_job_failed() {
    let (h, owner, id) = setup();
    h.upstream
        .script(|s| s.send_error = Some(UpstreamError::FloodWait(30)));

    let receipt = h
        .service
        .send_message(owner, id, text_to("@alice", "hi"))
        .await
        .unwrap();
    let job = settle(&h, owner, receipt.job_id).await;

    assert_eq!(job.status, MessageStatus::Failed);
    assert!(job.error.is_some_and(|e| e.contains("30")));
}

#[tokio::test]
async fn invalid_recipient_is_rejected_before_upstream() {
    let (h, owner, id) = setup();

    let result = h
        .service
        .send_message(owner, id, text_to("not a recipient", "hi"))
        .await;

    assert_matches!(result, Err(TelegramError::InvalidRecipient(_)));
    assert_eq!(h.upstream.connects(), 0);
}

#[tokio::test]
async fn delay_beyond_limit_is_rejected_before_upstream() {
    let (h, owner, id) = setup();

    for delay_ms in [MAX_SEND_DELAY_MS + 1, 100_000_000_000_000_000, u64::MAX] {
        let spec = SendSpec {
            delay_ms,
            ..text_to("@alice", "later")
        };
        let result = h.service.send_message(owner, id, spec).await;
        assert_matches!(result, Err(TelegramError::Validation(_)));
    }
    assert_eq!(h.upstream.connects(), 0);
}

#[tokio::test]
async fn delay_at_limit_is_scheduled() {
    let (h, owner, id) = setup();
    let spec = SendSpec {
        delay_ms: MAX_SEND_DELAY_MS,
        ..text_to("@alice", "tomorrow")
    };

    let receipt = h.service.send_message(owner, id, spec).await.unwrap();

    assert_eq!(receipt.status, MessageStatus::Scheduled);
    assert!(receipt.send_at > chrono::Utc::now() + chrono::Duration::hours(23));
}

#[tokio::test]
async fn media_message_requires_url() {
    let (h, owner, id) = setup();
    let spec = SendSpec {
        to: "@alice".into(),
        message_type: MessageType::Photo,
        ..SendSpec::default()
    };

    assert_matches!(
        h.service.send_message(owner, id, spec).await,
        Err(TelegramError::Validation(msg)) if msg.contains("media_url")
    );
}

#[tokio::test]
async fn media_is_downloaded_and_sent_with_caption() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .mount(&server)
        .await;

    let (h, owner, id) = setup();
    let spec = SendSpec {
        to: "@alice".into(),
        message_type: MessageType::Photo,
        media_url: Some(format!("{}/cat.jpg", server.uri())),
        caption: Some("look".into()),
        ..SendSpec::default()
    };

    let receipt = h.service.send_message(owner, id, spec).await.unwrap();
    let job = settle(&h, owner, receipt.job_id).await;

    assert_eq!(job.status, MessageStatus::Sent);
    let log = h.upstream.log.lock().unwrap();
    let (_, media) = &log.sent_media[0];
    assert_eq!(media.caption, "look");
    assert_eq!(media.file_name, "cat.jpg");
    assert!(!media.path.exists(), "downloaded file is removed after sending");
}

#[tokio::test(start_paused = true)]
async fn delayed_message_is_scheduled_until_due() {
    let (h, owner, id) = setup();
    let spec = SendSpec {
        delay_ms: 60_000,
        ..text_to("@alice", "later")
    };

    let receipt = h.service.send_message(owner, id, spec).await.unwrap();
    assert_eq!(receipt.status, MessageStatus::Scheduled);
    assert_eq!(receipt.message, "message scheduled");

    tokio::time::sleep(Duration::from_secs(30)).await;
    let waiting = h.service.job_status(owner, receipt.job_id).await.unwrap();
    assert_eq!(waiting.status, MessageStatus::Scheduled);
    assert!(h.upstream.sent_texts().is_empty());

    tokio::time::sleep(Duration::from_secs(31)).await;
    let job = settle(&h, owner, receipt.job_id).await;
    assert_eq!(job.status, MessageStatus::Sent);
}

#[tokio::test]
async fn empty_bulk_returns_no_results() {
    let (h, owner, id) = setup();

    let results = h
        .service
        .send_bulk(owner, id, BulkSpec::default())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(h.upstream.connects(), 0);
}

#[tokio::test]
async fn bulk_reports_bad_recipients_individually() {
    let (h, owner, id) = setup();
    let spec = BulkSpec {
        recipients: vec!["@alice".into(), "???".into(), "@alice".into()],
        text: "news".into(),
        delay_ms: 1000,
        ..BulkSpec::default()
    };

    let results = h.service.send_bulk(owner, id, spec).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, MessageStatus::Pending);
    assert_eq!(results[1].status, MessageStatus::Failed);
    assert!(results[1].job_id.is_none());
    assert!(results[1].message.is_some());
    // Spacing is by position, so the third recipient waits two intervals.
    assert_eq!(results[2].status, MessageStatus::Scheduled);

    let third = h
        .service
        .job_status(owner, results[2].job_id.unwrap())
        .await
        .unwrap();
    let first = h
        .service
        .job_status(owner, results[0].job_id.unwrap())
        .await
        .unwrap();
    let gap = third.send_at - first.send_at;
    assert!(gap >= chrono::Duration::milliseconds(1900), "gap was {gap}");
}

#[tokio::test]
async fn bulk_spacing_overflow_fails_only_the_later_recipients() {
    let (h, owner, id) = setup();
    let spec = BulkSpec {
        recipients: vec!["@alice".into(), "@alice".into(), "@alice".into()],
        text: "news".into(),
        delay_ms: u64::MAX,
        ..BulkSpec::default()
    };

    let results = h.service.send_bulk(owner, id, spec).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, MessageStatus::Pending);
    for later in &results[1..] {
        assert_eq!(later.status, MessageStatus::Failed);
        assert!(later.job_id.is_none());
        assert!(later.message.as_deref().is_some_and(|m| m.contains("delay_ms")));
    }
}

#[tokio::test]
async fn jobs_of_other_users_are_forbidden() {
    let (h, owner, id) = setup();
    let receipt = h
        .service
        .send_message(owner, id, text_to("@alice", "hi"))
        .await
        .unwrap();

    assert_matches!(
        h.service.job_status(DbId::new_v4(), receipt.job_id).await,
        Err(TelegramError::Unauthorized)
    );
    assert_matches!(
        h.service.job_status(owner, Uuid::new_v4()).await,
        Err(TelegramError::JobNotFound)
    );
}
