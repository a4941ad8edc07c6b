//! The operations the HTTP layer calls.
//!
//! [`SessionService`] owns login orchestration and session CRUD, and fronts
//! the chat, message, webhook, and pool operations with one ownership
//! policy. Every session-scoped call goes through [`SessionService::validate`]
//! (or [`SessionService::authorize`] for calls that must also work on
//! inactive records) before any upstream connection is opened.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use tgw_core::cache_keys;
use tgw_core::events::first_unknown_event;
use tgw_core::types::DbId;
use tgw_db::models::telegram_session::{
    AuthState, CompleteAuth, CreateTelegramSession, SessionResponse, TelegramSession,
};
use tgw_db::models::webhook::{UpsertWebhook, WebhookConfig};

use crate::auth::{AuthDriver, AuthOutcome, QrImage, QrSettings};
use crate::cache::KeyValueCache;
use crate::chats::{CacheKind, ChatService};
use crate::config::TelegramConfig;
use crate::connector::Connector;
use crate::error::TelegramError;
use crate::jobs::{BulkResult, BulkSpec, JobQueue, JobReceipt, MessageJob, SendSpec};
use crate::pool::{ActiveSessionInfo, SessionPool};
use crate::store::SessionStore;
use crate::types::{
    Chat, ChatsQuery, ChatsResponse, ContactsQuery, ContactsResponse, Fetched, HistoryParams,
    HistoryResponse, ResolveRequest, ResolvedPeer,
};

/// Phone placeholder of a QR record until the upstream identity is known.
pub const QR_PENDING_PHONE: &str = "QR-pending";

/// Required length of an upstream API hash.
pub const API_HASH_LEN: usize = 32;

pub const DEFAULT_WEBHOOK_MAX_RETRIES: i32 = 3;
pub const DEFAULT_WEBHOOK_TIMEOUT_MS: i32 = 5000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Sms,
    Qr,
}

/// Input of a login start.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub auth_method: AuthMethod,
    pub phone: Option<String>,
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: Option<String>,
}

/// A record whose login has started. `qr` is set for QR logins that issued
/// a token.
#[derive(Debug)]
pub struct CreatedSession {
    pub session: TelegramSession,
    pub qr: Option<QrImage>,
}

/// Public view of a record plus its coarse login status.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub status: &'static str,
}

impl From<&TelegramSession> for SessionDetails {
    fn from(s: &TelegramSession) -> Self {
        Self {
            session: SessionResponse::from(s),
            status: login_status(s),
        }
    }
}

/// `authenticated`, `failed`, or `waiting` for anything still in progress.
pub fn login_status(session: &TelegramSession) -> &'static str {
    match session.auth_state {
        AuthState::Authenticated if session.is_active => "authenticated",
        AuthState::Failed => "failed",
        _ => "waiting",
    }
}

/// Input of a webhook upsert. Zero retries/timeout select the defaults.
#[derive(Debug, Clone, Default)]
pub struct WebhookInput {
    pub url: String,
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub max_retries: i32,
    pub timeout_ms: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListeningStatus {
    pub status: &'static str,
    pub session_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub active_count: usize,
    pub sessions: Vec<ActiveSessionInfo>,
}

/// A QR flow still running in the background, keyed by session id.
struct QrFlowHandle {
    flow_id: Uuid,
    cancel: CancellationToken,
}

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    cache: Arc<dyn KeyValueCache>,
    connector: Arc<Connector>,
    auth: AuthDriver,
    pool: Arc<SessionPool>,
    chats: ChatService,
    jobs: Arc<JobQueue>,
    config: TelegramConfig,
    qr_flows: Arc<Mutex<HashMap<DbId, QrFlowHandle>>>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn KeyValueCache>,
        connector: Arc<Connector>,
        pool: Arc<SessionPool>,
        jobs: Arc<JobQueue>,
        config: TelegramConfig,
    ) -> Self {
        let auth = AuthDriver::new(
            Arc::clone(&connector),
            QrSettings {
                max_attempts: config.qr_max_attempts,
                attempt_timeout: config.qr_timeout,
                poll_interval: config.qr_poll_interval,
                first_token_timeout: config.qr_first_token_timeout,
            },
        );
        let chats = ChatService::new(
            Arc::clone(&connector),
            Arc::clone(&cache),
            config.cache_ttl.clone(),
        );
        Self {
            store,
            cache,
            connector,
            auth,
            pool,
            chats,
            jobs,
            config,
            qr_flows: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// Load a record the caller owns.
    pub async fn authorize(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<TelegramSession, TelegramError> {
        let session = self
            .store
            .get_by_id(session_id)
            .await?
            .ok_or(TelegramError::SessionNotFound)?;
        if session.user_id != user_id {
            return Err(TelegramError::Unauthorized);
        }
        Ok(session)
    }

    /// Load a record the caller owns and that is active.
    pub async fn validate(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<TelegramSession, TelegramError> {
        let session = self.authorize(user_id, session_id).await?;
        if !session.is_active {
            return Err(TelegramError::SessionNotActive);
        }
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    pub async fn create_session(
        &self,
        user_id: DbId,
        input: NewSession,
    ) -> Result<CreatedSession, TelegramError> {
        if input.api_id <= 0 {
            return Err(TelegramError::Validation("api_id must be positive".into()));
        }
        if input.api_hash.len() != API_HASH_LEN {
            return Err(TelegramError::Validation(format!(
                "api_hash must be {API_HASH_LEN} characters"
            )));
        }

        tracing::debug!(user_id = %user_id, method = ?input.auth_method, "Login start requested");
        match input.auth_method {
            AuthMethod::Sms => self.create_session_sms(user_id, input).await,
            AuthMethod::Qr => self.create_session_qr(user_id, input).await,
        }
    }

    async fn create_session_sms(
        &self,
        user_id: DbId,
        input: NewSession,
    ) -> Result<CreatedSession, TelegramError> {
        let phone = input
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(TelegramError::InvalidPhoneNumber)?
            .to_string();

        let existing = self.store.get_by_user_and_phone(user_id, &phone).await?;
        if existing.as_ref().is_some_and(|s| s.is_active) {
            return Err(TelegramError::SessionAlreadyExists);
        }

        let session_name = default_session_name(input.session_name.as_deref(), &phone);
        let phone_code_hash = self
            .auth
            .start_sms(input.api_id, &input.api_hash, &phone, &session_name)
            .await?;

        let record = CreateTelegramSession {
            user_id,
            phone_number: phone,
            api_id: input.api_id,
            api_hash_encrypted: self.connector.crypter().seal(input.api_hash.as_bytes())?,
            session_name,
            auth_state: AuthState::CodeSent,
        };
        let session = self.upsert_login_record(existing, &record).await?;

        self.cache
            .set(
                &cache_keys::phone_code(session.id),
                &phone_code_hash,
                self.config.code_ttl,
            )
            .await?;

        tracing::info!(session_id = %session.id, "SMS login started, code sent");
        Ok(CreatedSession { session, qr: None })
    }

    async fn create_session_qr(
        &self,
        user_id: DbId,
        input: NewSession,
    ) -> Result<CreatedSession, TelegramError> {
        let existing = self
            .store
            .get_by_user_and_phone(user_id, QR_PENDING_PHONE)
            .await?;
        if existing.as_ref().is_some_and(|s| s.is_active) {
            return Err(TelegramError::SessionAlreadyExists);
        }
        let reused = existing.is_some();

        let session_name = default_session_name(input.session_name.as_deref(), "QR");
        let record = CreateTelegramSession {
            user_id,
            phone_number: QR_PENDING_PHONE.to_string(),
            api_id: input.api_id,
            api_hash_encrypted: self.connector.crypter().seal(input.api_hash.as_bytes())?,
            session_name: session_name.clone(),
            auth_state: AuthState::Pending,
        };
        let session = self.upsert_login_record(existing, &record).await?;

        let flow_id = Uuid::new_v4();
        let cancel = self.cancel.child_token();
        if let Some(previous) = self.lock_flows().insert(
            session.id,
            QrFlowHandle {
                flow_id,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }

        let login = match self
            .auth
            .start_qr(input.api_id, &input.api_hash, &session_name, cancel.clone())
            .await
        {
            Ok(login) => login,
            Err(e) => {
                cancel.cancel();
                self.forget_flow(session.id, flow_id);
                if reused {
                    if let Err(state) = self
                        .store
                        .set_auth_state(session.id, AuthState::Failed)
                        .await
                    {
                        tracing::warn!(session_id = %session.id, error = %state, "Failed to mark QR record failed");
                    }
                } else if let Err(del) = self.store.delete(session.id).await {
                    tracing::warn!(session_id = %session.id, error = %del, "Failed to remove QR record");
                }
                tracing::error!(session_id = %session.id, error = %e, "QR login start failed");
                return Err(e);
            }
        };

        let store = Arc::clone(&self.store);
        let flows = Arc::clone(&self.qr_flows);
        let session_id = session.id;
        self.tasks.spawn(async move {
            persist_qr_outcome(store.as_ref(), session_id, login.outcome).await;
            let mut flows = flows.lock().unwrap_or_else(PoisonError::into_inner);
            if flows.get(&session_id).is_some_and(|f| f.flow_id == flow_id) {
                flows.remove(&session_id);
            }
        });

        tracing::info!(session_id = %session.id, "QR login started, waiting for scan");
        Ok(CreatedSession {
            session,
            qr: login.image,
        })
    }

    /// Submit the SMS code for a record whose login was started.
    pub async fn verify_code(
        &self,
        user_id: DbId,
        session_id: DbId,
        code: &str,
    ) -> Result<TelegramSession, TelegramError> {
        let session = self.authorize(user_id, session_id).await?;
        if session.is_usable() {
            return Ok(session);
        }
        if code.trim().is_empty() {
            return Err(TelegramError::Validation("code is required".into()));
        }

        let key = cache_keys::phone_code(session_id);
        let phone_code_hash = self
            .cache
            .get(&key)
            .await?
            .filter(|h| !h.is_empty())
            .ok_or(TelegramError::CodeExpired)?;

        let outcome = match self
            .auth
            .complete_sms(&session, code.trim(), &phone_code_hash)
            .await
        {
            Ok(outcome) => outcome,
            Err(TelegramError::PasswordRequired) => {
                self.store
                    .set_auth_state(session_id, AuthState::PasswordRequired)
                    .await?;
                return Err(TelegramError::PasswordRequired);
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Code verification failed");
                return Err(e);
            }
        };

        let updated = self
            .store
            .complete_auth(session_id, &complete_auth(outcome))
            .await?
            .ok_or(TelegramError::SessionNotFound)?;

        if let Err(e) = self.cache.delete(&[key]).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to drop phone code hash");
        }
        tracing::info!(
            session_id = %session_id,
            telegram_user_id = ?updated.telegram_user_id,
            "Session authenticated"
        );
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    pub async fn list_sessions(&self, user_id: DbId) -> Result<Vec<TelegramSession>, TelegramError> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    pub async fn get_session(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<TelegramSession, TelegramError> {
        self.authorize(user_id, session_id).await
    }

    /// Stop, log out, and delete a record.
    ///
    /// The upstream logout is best effort and bounded by the logout budget.
    pub async fn delete_session(&self, user_id: DbId, session_id: DbId) -> Result<(), TelegramError> {
        let session = self.authorize(user_id, session_id).await?;

        self.pool.stop_session(session_id).await;
        if let Some(flow) = self.lock_flows().remove(&session_id) {
            flow.cancel.cancel();
        }

        if session.is_active && !session.session_data.is_empty() {
            self.log_out(&session).await;
        }

        if let Err(e) = self.chats.invalidate(session_id, CacheKind::All).await {
            tracing::warn!(session_id = %session_id, error = %e, "Cache invalidation failed");
        }

        if !self.store.delete(session_id).await? {
            return Err(TelegramError::SessionNotFound);
        }
        tracing::info!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chats
    // -----------------------------------------------------------------------

    pub async fn get_chats(
        &self,
        user_id: DbId,
        session_id: DbId,
        query: &ChatsQuery,
    ) -> Result<ChatsResponse, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.chats.get_chats(&session, query).await
    }

    pub async fn get_chat_info(
        &self,
        user_id: DbId,
        session_id: DbId,
        chat_id: i64,
        refresh: bool,
    ) -> Result<Fetched<Chat>, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.chats.get_chat_info(&session, chat_id, refresh).await
    }

    pub async fn get_history(
        &self,
        user_id: DbId,
        session_id: DbId,
        chat_id: i64,
        params: &HistoryParams,
    ) -> Result<HistoryResponse, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.chats.get_history(&session, chat_id, params).await
    }

    pub async fn get_contacts(
        &self,
        user_id: DbId,
        session_id: DbId,
        query: &ContactsQuery,
    ) -> Result<ContactsResponse, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.chats.get_contacts(&session, query).await
    }

    pub async fn resolve(
        &self,
        user_id: DbId,
        session_id: DbId,
        request: &ResolveRequest,
    ) -> Result<Fetched<ResolvedPeer>, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.chats.resolve(&session, request).await
    }

    pub async fn invalidate_cache(
        &self,
        user_id: DbId,
        session_id: DbId,
        kind: &str,
    ) -> Result<(), TelegramError> {
        self.validate(user_id, session_id).await?;
        let kind: CacheKind = kind.parse()?;
        self.chats.invalidate(session_id, kind).await
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    pub async fn send_message(
        &self,
        user_id: DbId,
        session_id: DbId,
        spec: SendSpec,
    ) -> Result<JobReceipt, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.jobs.enqueue(&session, spec).await
    }

    pub async fn send_bulk(
        &self,
        user_id: DbId,
        session_id: DbId,
        spec: BulkSpec,
    ) -> Result<Vec<BulkResult>, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        self.jobs.enqueue_bulk(&session, spec).await
    }

    /// A job of one of the caller's sessions.
    pub async fn job_status(&self, user_id: DbId, job_id: Uuid) -> Result<MessageJob, TelegramError> {
        let job = self.jobs.get_job(job_id).await?;
        match self.store.get_by_id(job.session_id).await? {
            Some(session) if session.user_id == user_id => Ok(job),
            Some(_) => Err(TelegramError::Unauthorized),
            None => Err(TelegramError::JobNotFound),
        }
    }

    // -----------------------------------------------------------------------
    // Webhooks and pool
    // -----------------------------------------------------------------------

    pub async fn set_webhook(
        &self,
        user_id: DbId,
        session_id: DbId,
        input: WebhookInput,
    ) -> Result<WebhookConfig, TelegramError> {
        self.validate(user_id, session_id).await?;

        let url = input.url.trim();
        if url.is_empty() {
            return Err(TelegramError::Validation("url is required".into()));
        }
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| TelegramError::Validation(format!("invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TelegramError::Validation("url must be http or https".into()));
        }
        if let Some(unknown) = first_unknown_event(&input.events) {
            return Err(TelegramError::Validation(format!(
                "unknown event type: {unknown}"
            )));
        }
        if input.max_retries < 0 || input.timeout_ms < 0 {
            return Err(TelegramError::Validation(
                "max_retries and timeout_ms must not be negative".into(),
            ));
        }

        let webhook = self
            .store
            .upsert_webhook(&UpsertWebhook {
                session_id,
                url: url.to_string(),
                secret: input.secret.filter(|s| !s.is_empty()),
                events: input.events,
                max_retries: non_zero_or(input.max_retries, DEFAULT_WEBHOOK_MAX_RETRIES),
                timeout_ms: non_zero_or(input.timeout_ms, DEFAULT_WEBHOOK_TIMEOUT_MS),
            })
            .await?;
        tracing::info!(session_id = %session_id, "Webhook configured");
        Ok(webhook)
    }

    pub async fn get_webhook(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<WebhookConfig, TelegramError> {
        self.authorize(user_id, session_id).await?;
        self.store
            .get_webhook(session_id)
            .await?
            .ok_or(TelegramError::WebhookNotConfigured)
    }

    /// Delete the webhook and stop the session's pool entry.
    pub async fn delete_webhook(&self, user_id: DbId, session_id: DbId) -> Result<bool, TelegramError> {
        self.authorize(user_id, session_id).await?;
        self.pool.stop_session(session_id).await;
        Ok(self.store.delete_webhook(session_id).await?)
    }

    pub async fn start_listening(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<ListeningStatus, TelegramError> {
        let session = self.validate(user_id, session_id).await?;
        let webhook = self
            .store
            .get_webhook(session_id)
            .await?
            .filter(|w| w.is_active)
            .ok_or(TelegramError::WebhookNotConfigured)?;
        if !session.is_pool_eligible() {
            return Err(TelegramError::SessionNotActive);
        }

        self.pool.start_session(&session).await?;
        Ok(ListeningStatus {
            status: "listening",
            session_id,
            webhook: Some(webhook.url),
        })
    }

    pub async fn stop_listening(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<ListeningStatus, TelegramError> {
        self.validate(user_id, session_id).await?;
        self.pool.stop_session(session_id).await;
        Ok(ListeningStatus {
            status: "stopped",
            session_id,
            webhook: None,
        })
    }

    /// Pool entries visible to the caller: all for admins, own otherwise.
    pub async fn pool_status(&self, user_id: DbId, is_admin: bool) -> PoolStatus {
        let sessions = if is_admin {
            self.pool.list_active().await
        } else {
            self.pool.list_for_owner(user_id).await
        };
        PoolStatus {
            active_count: sessions.len(),
            sessions,
        }
    }

    /// Cancel running QR flows and wait up to `budget` for their tasks.
    pub async fn shutdown(&self, budget: Duration) {
        self.cancel.cancel();
        self.tasks.close();
        if tokio::time::timeout(budget, self.tasks.wait()).await.is_err() {
            tracing::warn!("Login tasks did not stop within budget");
        }
    }

    // ---- private helpers ----

    /// Insert a fresh login record, or restart login on an inactive one.
    async fn upsert_login_record(
        &self,
        existing: Option<TelegramSession>,
        record: &CreateTelegramSession,
    ) -> Result<TelegramSession, TelegramError> {
        match existing {
            Some(old) => self
                .store
                .reset_for_login(old.id, record)
                .await?
                .ok_or(TelegramError::SessionAlreadyExists),
            None => Ok(self.store.create(record).await?),
        }
    }

    async fn log_out(&self, session: &TelegramSession) {
        let logout = async {
            let client = self
                .connector
                .open(session, CancellationToken::new())
                .await?;
            let result = client.call(client.client().log_out()).await;
            client.close().await;
            Ok::<(), TelegramError>(result?)
        };
        match tokio::time::timeout(self.config.logout_budget, logout).await {
            Ok(Ok(())) => tracing::info!(session_id = %session.id, "Upstream logout completed"),
            Ok(Err(e)) => tracing::warn!(session_id = %session.id, error = %e, "Upstream logout failed"),
            Err(_) => tracing::warn!(session_id = %session.id, "Upstream logout timed out"),
        }
    }

    fn lock_flows(&self) -> std::sync::MutexGuard<'_, HashMap<DbId, QrFlowHandle>> {
        self.qr_flows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget_flow(&self, session_id: DbId, flow_id: Uuid) {
        let mut flows = self.lock_flows();
        if flows.get(&session_id).is_some_and(|f| f.flow_id == flow_id) {
            flows.remove(&session_id);
        }
    }
}

/// Record the background outcome of a QR login.
async fn persist_qr_outcome(
    store: &dyn SessionStore,
    session_id: DbId,
    outcome: oneshot::Receiver<Result<AuthOutcome, TelegramError>>,
) {
    let outcome = match outcome.await {
        Ok(outcome) => outcome,
        Err(_) => Err(TelegramError::Internal("QR login task ended without a result".into())),
    };

    let session = match store.get_by_id(session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::warn!(session_id = %session_id, "QR record gone before login finished");
            return;
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "QR record lookup failed");
            return;
        }
    };
    if session.is_active {
        return;
    }

    match outcome {
        Ok(outcome) => {
            let telegram_user_id = outcome.telegram_user_id;
            let phone = format!("TG-{telegram_user_id}");
            match store
                .complete_qr_auth(session_id, &complete_auth(outcome), &phone)
                .await
            {
                Ok(Some(session)) => tracing::info!(
                    session_id = %session_id,
                    telegram_user_id,
                    phone = %session.phone_number,
                    "QR session authenticated"
                ),
                Ok(None) => {
                    tracing::warn!(session_id = %session_id, "QR record gone before login was stored");
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Failed to store QR login");
                    if let Err(e) = store.set_auth_state(session_id, AuthState::Failed).await {
                        tracing::error!(session_id = %session_id, error = %e, "Failed to mark QR record failed");
                    }
                }
            }
        }
        Err(e) if e.is_cancellation() => {
            tracing::info!(session_id = %session_id, "QR login cancelled");
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "QR login failed");
            if let Err(e) = store.set_auth_state(session_id, AuthState::Failed).await {
                tracing::error!(session_id = %session_id, error = %e, "Failed to mark QR record failed");
            }
        }
    }
}

fn complete_auth(outcome: AuthOutcome) -> CompleteAuth {
    CompleteAuth {
        session_data: outcome.sealed_session,
        telegram_user_id: outcome.telegram_user_id,
        telegram_username: outcome.telegram_username,
    }
}

fn default_session_name(name: Option<&str>, fallback: &str) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("Session {fallback}"),
    }
}

fn non_zero_or(value: i32, default: i32) -> i32 {
    if value == 0 {
        default
    } else {
        value
    }
}
