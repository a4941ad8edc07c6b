//! Bounded event fan-out from pool updates to webhook deliveries.
//!
//! [`EventDispatcher::dispatch`] never blocks: it `try_send`s onto a bounded
//! channel and drops the event with a warning when the buffer is full.
//! [`EventDispatcher::spawn_workers`] starts a fixed pool of workers that
//! share the receiving end and deliver concurrently, so events of one session
//! may arrive out of order.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tgw_core::events::is_event_allowed;
use tgw_core::types::DbId;

use crate::delivery::webhook::{DeliveryTarget, WebhookDelivery};
use crate::envelope::WebhookEvent;
use crate::store::WebhookStore;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Capacity of the event buffer.
    pub buffer_size: usize,
    /// Number of delivery workers.
    pub workers: usize,
    /// Used when a webhook config stores `max_retries = 0`.
    pub default_max_retries: u32,
    /// Used when a webhook config stores `timeout_ms = 0`.
    pub default_timeout: Duration,
    /// Attempt `n` failing sleeps `n × backoff_step` before the next one.
    pub backoff_step: Duration,
    /// Wall-clock budget for one event across all of its attempts.
    pub delivery_budget: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            workers: 10,
            default_max_retries: 3,
            default_timeout: Duration::from_millis(5000),
            backoff_step: Duration::from_secs(1),
            delivery_budget: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    /// Load from environment variables, falling back to [`Default`].
    ///
    /// | Env var                       | Default |
    /// |-------------------------------|---------|
    /// | `DISPATCHER_BUFFER_SIZE`      | `1000`  |
    /// | `DISPATCHER_WORKERS`          | `10`    |
    /// | `WEBHOOK_DEFAULT_MAX_RETRIES` | `3`     |
    /// | `WEBHOOK_DEFAULT_TIMEOUT_MS`  | `5000`  |
    ///
    /// # Panics
    ///
    /// Panics if a variable does not parse or `DISPATCHER_WORKERS` is zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let workers: usize = env_parse("DISPATCHER_WORKERS", defaults.workers);
        assert!(workers > 0, "DISPATCHER_WORKERS must be at least 1");

        Self {
            buffer_size: env_parse("DISPATCHER_BUFFER_SIZE", defaults.buffer_size),
            workers,
            default_max_retries: env_parse(
                "WEBHOOK_DEFAULT_MAX_RETRIES",
                defaults.default_max_retries,
            ),
            default_timeout: Duration::from_millis(env_parse("WEBHOOK_DEFAULT_TIMEOUT_MS", 5000)),
            ..defaults
        }
    }
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + ToString,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid number"))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an event never made it into the buffer. Logged, never surfaced to
/// callers of [`EventDispatcher::dispatch`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("event buffer is full")]
    BufferFull,

    #[error("event buffer is closed")]
    Closed,

    #[error("event data could not be serialized: {0}")]
    Serialize(String),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sending half of the event buffer. Cheap to clone.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<WebhookEvent>,
}

/// Receiving half of the event buffer, consumed by [`EventDispatcher::spawn_workers`].
pub struct EventQueue {
    rx: mpsc::Receiver<WebhookEvent>,
}

impl EventQueue {
    /// Next buffered event, waiting for one. `None` once every dispatcher
    /// handle is dropped.
    pub async fn recv(&mut self) -> Option<WebhookEvent> {
        self.rx.recv().await
    }

    /// Next buffered event, if one is ready.
    pub fn try_recv(&mut self) -> Option<WebhookEvent> {
        self.rx.try_recv().ok()
    }
}

impl EventDispatcher {
    /// Create a dispatcher with a buffer of `buffer_size` events.
    pub fn new(buffer_size: usize) -> (Self, EventQueue) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Self { tx }, EventQueue { rx })
    }

    /// Fire-and-forget enqueue. Drops (and logs) the event on a full buffer.
    pub fn dispatch<T: Serialize>(&self, session_id: DbId, event_type: &str, data: &T) {
        if let Err(e) = self.try_dispatch(session_id, event_type, data) {
            tracing::warn!(
                session_id = %session_id,
                event_type,
                error = %e,
                "Event dropped"
            );
        }
    }

    /// Enqueue, reporting why the event was not accepted.
    pub fn try_dispatch<T: Serialize>(
        &self,
        session_id: DbId,
        event_type: &str,
        data: &T,
    ) -> Result<(), DispatchError> {
        let data =
            serde_json::to_value(data).map_err(|e| DispatchError::Serialize(e.to_string()))?;
        self.enqueue(WebhookEvent::new(session_id, event_type, data))
    }

    /// Enqueue an already-built envelope.
    pub fn enqueue(&self, event: WebhookEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Start `config.workers` delivery workers draining `queue`.
    ///
    /// Workers stop when `cancel` fires or every dispatcher handle is dropped.
    pub fn spawn_workers(
        queue: EventQueue,
        store: Arc<dyn WebhookStore>,
        delivery: WebhookDelivery,
        config: DispatcherConfig,
        cancel: CancellationToken,
    ) -> DispatcherHandle {
        let rx = Arc::new(Mutex::new(queue.rx));
        let worker = Arc::new(Worker {
            store,
            delivery,
            config: config.clone(),
        });

        let handles = (0..config.workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let worker = Arc::clone(&worker);
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run(id, rx, cancel).await })
            })
            .collect();

        tracing::info!(workers = config.workers, buffer = config.buffer_size, "Event dispatcher started");
        DispatcherHandle { handles, cancel }
    }
}

/// Join handles of the running workers.
pub struct DispatcherHandle {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl DispatcherHandle {
    /// Signal the workers to stop and wait up to `budget` for them to finish
    /// their in-flight deliveries.
    pub async fn shutdown(self, budget: Duration) {
        self.cancel.cancel();
        let all = async {
            for handle in self.handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(budget, all).await.is_err() {
            tracing::warn!("Event dispatcher workers did not stop within budget");
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    store: Arc<dyn WebhookStore>,
    delivery: WebhookDelivery,
    config: DispatcherConfig,
}

impl Worker {
    async fn run(
        self: Arc<Self>,
        id: usize,
        rx: Arc<Mutex<mpsc::Receiver<WebhookEvent>>>,
        cancel: CancellationToken,
    ) {
        loop {
            let next = {
                let mut rx = rx.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    event = rx.recv() => event,
                }
            };
            let Some(event) = next else {
                break;
            };

            let event_id = event.id.clone();
            // Each event runs in its own task so a panic is contained to it.
            let this = Arc::clone(&self);
            let outcome = tokio::spawn(async move { this.process(event).await }).await;
            if let Err(e) = outcome {
                if e.is_panic() {
                    tracing::error!(worker = id, event_id = %event_id, "Event delivery panicked");
                }
            }
        }
        tracing::debug!(worker = id, "Event dispatcher worker stopped");
    }

    async fn process(&self, event: WebhookEvent) {
        let session_id = event.session_id;

        let webhook = match self.store.get_by_session_id(session_id).await {
            Ok(Some(w)) if w.is_active => w,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to load webhook config");
                return;
            }
        };
        if !is_event_allowed(&webhook.events, &event.event_type) {
            return;
        }

        let target = DeliveryTarget {
            url: webhook.url.clone(),
            secret: webhook.secret.clone(),
            max_attempts: match webhook.max_retries {
                n if n > 0 => n as u32,
                _ => self.config.default_max_retries,
            },
            attempt_timeout: match webhook.timeout_ms {
                n if n > 0 => Duration::from_millis(n as u64),
                _ => self.config.default_timeout,
            },
            backoff_step: self.config.backoff_step,
        };

        let result =
            tokio::time::timeout(self.config.delivery_budget, self.delivery.deliver(&target, &event))
                .await;
        let error = match result {
            Ok(Ok(attempts)) => {
                tracing::debug!(
                    session_id = %session_id,
                    event_type = %event.event_type,
                    attempts,
                    "Event delivered to webhook"
                );
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "webhook delivery timed out".to_string(),
        };

        tracing::error!(
            session_id = %session_id,
            url = %webhook.url,
            event_id = %event.id,
            error = %error,
            "Webhook failed after retries"
        );
        if let Err(e) = self.store.record_failure(session_id, &error).await {
            tracing::error!(session_id = %session_id, error = %e, "Failed to record webhook failure");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
