#![allow(dead_code)]

//! Shared fakes for dispatcher integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tgw_core::types::DbId;
use tgw_db::models::webhook::WebhookConfig;
use tgw_events::WebhookStore;
use wiremock::MockServer;

/// In-memory [`WebhookStore`] recording every failure it is told about.
#[derive(Default)]
pub struct MemoryWebhookStore {
    configs: Mutex<HashMap<DbId, WebhookConfig>>,
    failures: Mutex<Vec<(DbId, String)>>,
}

impl MemoryWebhookStore {
    pub fn insert(&self, config: WebhookConfig) {
        self.configs.lock().unwrap().insert(config.session_id, config);
    }

    pub fn failures(&self) -> Vec<(DbId, String)> {
        self.failures.lock().unwrap().clone()
    }

    pub fn config(&self, session_id: DbId) -> Option<WebhookConfig> {
        self.configs.lock().unwrap().get(&session_id).cloned()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn get_by_session_id(
        &self,
        session_id: DbId,
    ) -> Result<Option<WebhookConfig>, sqlx::Error> {
        Ok(self.config(session_id))
    }

    async fn record_failure(&self, session_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        self.failures
            .lock()
            .unwrap()
            .push((session_id, error.to_string()));
        if let Some(cfg) = self.configs.lock().unwrap().get_mut(&session_id) {
            cfg.last_error = Some(error.to_string());
            cfg.last_error_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}

pub fn webhook(session_id: DbId, url: &str, events: &[&str]) -> WebhookConfig {
    let now = chrono::Utc::now();
    WebhookConfig {
        id: DbId::new_v4(),
        session_id,
        url: url.to_string(),
        secret: None,
        events: events.iter().map(|e| e.to_string()).collect(),
        is_active: true,
        max_retries: 3,
        timeout_ms: 5000,
        last_error: None,
        last_error_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Wait until `server` has recorded at least `n` requests.
pub async fn wait_for_requests(server: &MockServer, n: usize, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let seen = server.received_requests().await.map_or(0, |r| r.len());
        if seen >= n {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
