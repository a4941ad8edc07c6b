//! Outbound message jobs.
//!
//! A send request becomes a [`MessageJob`] kept in the key/value cache for
//! the job TTL. Each job is executed by its own detached task: wait until
//! `send_at`, resolve the recipient, download media if needed, send, and
//! record `sent` or `failed`. Status only moves forward along
//! [`MessageStatus::can_transition_to`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use tgw_core::cache_keys;
use tgw_core::error::CoreError;
use tgw_core::messages::{MessageStatus, MessageType, MAX_SEND_DELAY_MS};
use tgw_core::recipient::Recipient;
use tgw_core::types::{DbId, Timestamp};
use tgw_db::models::telegram_session::TelegramSession;

use crate::cache::{CacheJsonExt, KeyValueCache};
use crate::config::TelegramConfig;
use crate::connector::Connector;
use crate::error::TelegramError;
use crate::mapping;
use crate::store::SessionStore;
use crate::upstream::{InputPeer, OutgoingMedia, ScopedClient};

/// First name given to contacts imported to reach a phone recipient.
const IMPORTED_CONTACT_NAME: &str = "Contact";

/// Suffix of downloaded media whose URL path carries no extension.
const DEFAULT_MEDIA_SUFFIX: &str = ".tmp";

/// State of one outbound message, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageJob {
    pub id: Uuid,
    pub session_id: DbId,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub send_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// One message to send.
#[derive(Debug, Clone, Default)]
pub struct SendSpec {
    pub to: String,
    pub message_type: MessageType,
    pub text: String,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub delay_ms: u64,
}

/// The same message to many recipients.
#[derive(Debug, Clone, Default)]
pub struct BulkSpec {
    pub recipients: Vec<String>,
    pub message_type: MessageType,
    pub text: String,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    /// Spacing between consecutive recipients.
    pub delay_ms: u64,
}

/// Returned to the caller when a job is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct JobReceipt {
    pub job_id: Uuid,
    pub status: MessageStatus,
    pub send_at: Timestamp,
    pub message: String,
}

/// Per-recipient outcome of a bulk enqueue.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct JobQueue {
    connector: Arc<Connector>,
    store: Arc<dyn SessionStore>,
    cache: Arc<dyn KeyValueCache>,
    http: reqwest::Client,
    job_ttl: Duration,
    execution_budget: Duration,
    bulk_min_spacing: Duration,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl JobQueue {
    pub fn new(
        connector: Arc<Connector>,
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn KeyValueCache>,
        config: &TelegramConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            connector,
            store,
            cache,
            http: reqwest::Client::new(),
            job_ttl: config.job_ttl,
            execution_budget: config.job_execution_budget,
            bulk_min_spacing: config.bulk_min_spacing,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    /// Validate and store a job, then start its execution task.
    pub async fn enqueue(
        self: &Arc<Self>,
        session: &TelegramSession,
        spec: SendSpec,
    ) -> Result<JobReceipt, TelegramError> {
        if !session.is_usable() {
            return Err(TelegramError::SessionNotActive);
        }
        let recipient = Recipient::parse(&spec.to).map_err(|e| match e {
            CoreError::Validation(msg) => TelegramError::InvalidRecipient(msg),
            other => TelegramError::InvalidRecipient(other.to_string()),
        })?;
        let media_url = spec.media_url.filter(|u| !u.trim().is_empty());
        if spec.message_type.is_media() && media_url.is_none() {
            return Err(TelegramError::Validation(format!(
                "media_url is required for {} messages",
                spec.message_type.as_str()
            )));
        }

        if spec.delay_ms > MAX_SEND_DELAY_MS {
            return Err(TelegramError::Validation(format!(
                "delay_ms must not exceed {MAX_SEND_DELAY_MS}"
            )));
        }

        let now = chrono::Utc::now();
        let send_at = i64::try_from(spec.delay_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or_else(|| TelegramError::Validation("delay_ms is out of range".into()))?;
        let delayed = spec.delay_ms > 0;
        let job = MessageJob {
            id: Uuid::new_v4(),
            session_id: session.id,
            to: spec.to,
            text: spec.text,
            message_type: spec.message_type,
            media_url,
            caption: spec.caption.filter(|c| !c.is_empty()),
            status: if delayed {
                MessageStatus::Scheduled
            } else {
                MessageStatus::Pending
            },
            error: None,
            send_at,
            sent_at: None,
            created_at: now,
        };

        self.cache
            .set_json(&cache_keys::message_job(job.id), &job, self.job_ttl)
            .await?;

        let receipt = JobReceipt {
            job_id: job.id,
            status: job.status,
            send_at: job.send_at,
            message: if delayed {
                "message scheduled".into()
            } else {
                "message queued".into()
            },
        };

        tracing::debug!(
            job_id = %job.id,
            session_id = %job.session_id,
            status = ?job.status,
            "Message job queued"
        );
        let queue = Arc::clone(self);
        let delay = Duration::from_millis(spec.delay_ms);
        self.tasks
            .spawn(async move { queue.execute(job, recipient, delay).await });
        Ok(receipt)
    }

    /// Enqueue one job per recipient, spacing them `index × delay` apart.
    ///
    /// A failing recipient is reported in its own result and does not stop
    /// the batch.
    pub async fn enqueue_bulk(
        self: &Arc<Self>,
        session: &TelegramSession,
        spec: BulkSpec,
    ) -> Result<Vec<BulkResult>, TelegramError> {
        if spec.recipients.is_empty() {
            return Ok(Vec::new());
        }
        if !session.is_usable() {
            return Err(TelegramError::SessionNotActive);
        }

        let spacing = Duration::from_millis(spec.delay_ms).max(self.bulk_min_spacing);
        let mut results = Vec::with_capacity(spec.recipients.len());

        for (index, recipient) in spec.recipients.into_iter().enumerate() {
            let single = SendSpec {
                to: recipient.clone(),
                message_type: spec.message_type,
                text: spec.text.clone(),
                media_url: spec.media_url.clone(),
                caption: spec.caption.clone(),
                delay_ms: bulk_delay_ms(spacing, index),
            };
            match self.enqueue(session, single).await {
                Ok(receipt) => results.push(BulkResult {
                    recipient,
                    job_id: Some(receipt.job_id),
                    status: receipt.status,
                    message: None,
                }),
                Err(e) => results.push(BulkResult {
                    recipient,
                    job_id: None,
                    status: MessageStatus::Failed,
                    message: Some(e.to_string()),
                }),
            }
        }
        Ok(results)
    }

    /// Current state of a job.
    pub async fn get_job(&self, job_id: Uuid) -> Result<MessageJob, TelegramError> {
        self.cache
            .get_json(&cache_keys::message_job(job_id))
            .await?
            .ok_or(TelegramError::JobNotFound)
    }

    /// Cancel waiting jobs and wait up to `budget` for running ones.
    pub async fn shutdown(&self, budget: Duration) {
        self.cancel.cancel();
        self.tasks.close();
        if tokio::time::timeout(budget, self.tasks.wait()).await.is_err() {
            tracing::warn!("Message jobs did not stop within budget");
        }
    }

    // ---- execution ----

    async fn execute(self: Arc<Self>, mut job: MessageJob, recipient: Recipient, delay: Duration) {
        if !delay.is_zero() {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(job_id = %job.id, "Scheduled job abandoned on shutdown");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if !self.advance(&mut job, MessageStatus::Sending, None).await {
            return;
        }

        let send = self.send(&job, &recipient);
        let outcome = match tokio::time::timeout(self.execution_budget, send).await {
            Ok(result) => result,
            Err(_) => Err(TelegramError::Timeout(
                "message send exceeded its budget".into(),
            )),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(job_id = %job.id, to = %job.to, "Message sent");
                self.advance(&mut job, MessageStatus::Sent, None).await;
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Message send failed");
                self.advance(&mut job, MessageStatus::Failed, Some(e.to_string()))
                    .await;
            }
        }
    }

    /// Move `job` to `next` and persist it. Returns `false` for a transition
    /// the state machine forbids.
    async fn advance(
        &self,
        job: &mut MessageJob,
        next: MessageStatus,
        error: Option<String>,
    ) -> bool {
        if !job.status.can_transition_to(next) {
            tracing::warn!(job_id = %job.id, from = ?job.status, to = ?next, "Illegal job transition");
            return false;
        }
        job.status = next;
        job.error = error;
        if next == MessageStatus::Sent {
            job.sent_at = Some(chrono::Utc::now());
        }
        if let Err(e) = self
            .cache
            .set_json(&cache_keys::message_job(job.id), job, self.job_ttl)
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to store job state");
        }
        true
    }

    async fn send(&self, job: &MessageJob, recipient: &Recipient) -> Result<(), TelegramError> {
        let session = self
            .store
            .get_by_id(job.session_id)
            .await?
            .ok_or(TelegramError::SessionNotFound)?;
        if !session.is_usable() {
            return Err(TelegramError::SessionNotActive);
        }

        let client = self
            .connector
            .open(&session, self.cancel.child_token())
            .await?;
        let result: Result<(), TelegramError> = async {
            let peer = resolve_recipient(&client, recipient).await?;
            match job.media_url.as_deref() {
                Some(url) if job.message_type.is_media() => {
                    let file = self.download(url).await?;
                    let media = OutgoingMedia {
                        kind: job.message_type,
                        path: file.path().to_path_buf(),
                        file_name: file_name_of(url),
                        mime_type: mime_type_of(job.message_type),
                        caption: job.caption.clone().unwrap_or_else(|| job.text.clone()),
                    };
                    client.call(client.client().send_media(&peer, &media)).await?;
                    // `file` is removed when it goes out of scope.
                    Ok(())
                }
                _ => Ok(client.call(client.client().send_text(&peer, &job.text)).await?),
            }
        }
        .await;
        client.close().await;
        result
    }

    async fn download(&self, url: &str) -> Result<tempfile::NamedTempFile, TelegramError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TelegramError::MediaDownload(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TelegramError::MediaDownload(e.to_string()))?;

        let file = tempfile::Builder::new()
            .prefix("tg-media-")
            .suffix(&media_suffix(url))
            .tempfile()
            .map_err(|e| TelegramError::Internal(format!("temp file: {e}")))?;
        tokio::fs::write(file.path(), &bytes)
            .await
            .map_err(|e| TelegramError::Internal(format!("temp file write: {e}")))?;
        Ok(file)
    }
}

/// Delay of the `index`-th bulk recipient. Saturates at `u64::MAX`, which
/// the per-recipient enqueue then rejects.
fn bulk_delay_ms(spacing: Duration, index: usize) -> u64 {
    u32::try_from(index)
        .ok()
        .and_then(|i| spacing.checked_mul(i))
        .and_then(|delay| u64::try_from(delay.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// Turn a parsed recipient into an addressable peer.
///
/// Usernames are resolved and phones imported as contacts; numeric ids are
/// used as-is.
pub async fn resolve_recipient(
    client: &ScopedClient,
    recipient: &Recipient,
) -> Result<InputPeer, TelegramError> {
    match recipient {
        Recipient::Username(name) => {
            let raw = client.call(client.client().resolve_username(name)).await?;
            mapping::input_peer(&raw).ok_or_else(|| TelegramError::PeerNotFound(format!("@{name}")))
        }
        Recipient::Phone(phone) => {
            let user = client
                .call(
                    client
                        .client()
                        .import_contact(phone, IMPORTED_CONTACT_NAME, ""),
                )
                .await?;
            Ok(InputPeer::User {
                id: user.id,
                access_hash: user.access_hash,
            })
        }
        Recipient::UserId(id) => Ok(InputPeer::User {
            id: *id,
            access_hash: 0,
        }),
        Recipient::ChatId(id) => Ok(InputPeer::Chat { id: *id }),
        Recipient::ChannelId(id) => Ok(InputPeer::Channel {
            id: *id,
            access_hash: 0,
        }),
    }
}

fn url_path(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string())
}

/// Temp-file suffix taken from the URL path, `.tmp` when it has none.
fn media_suffix(url: &str) -> String {
    let path = url_path(url);
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| DEFAULT_MEDIA_SUFFIX.to_string())
}

fn file_name_of(url: &str) -> String {
    let path = url_path(url);
    Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("file")
        .to_string()
}

fn mime_type_of(kind: MessageType) -> Option<&'static str> {
    match kind {
        MessageType::Video => Some("video/mp4"),
        MessageType::Audio => Some("audio/mpeg"),
        _ => None,
    }
}
