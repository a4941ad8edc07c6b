#![allow(dead_code)]

//! Scripted upstream, in-memory store, and a wired-up service for the
//! session core integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tgw_core::crypto::Crypter;
use tgw_core::types::DbId;
use tgw_db::models::telegram_session::{
    AuthState, CompleteAuth, CreateTelegramSession, TelegramSession,
};
use tgw_db::models::webhook::{UpsertWebhook, WebhookConfig};
use tgw_events::{EventDispatcher, EventQueue, WebhookEvent};
use tgw_telegram::cache::MemoryCache;
use tgw_telegram::connector::Connector;
use tgw_telegram::jobs::JobQueue;
use tgw_telegram::pool::SessionPool;
use tgw_telegram::sessions::SessionService;
use tgw_telegram::store::SessionStore;
use tgw_telegram::upstream::{
    ClientFactory, ConnectParams, ContactsPage, DialogsPage, HistoryPage, HistoryQuery,
    InputPeer, LoginToken, OutgoingMedia, RawChannel, RawUser, ResolvedRaw, UpstreamClient,
    UpstreamError, Update,
};
use tgw_telegram::TelegramConfig;

pub const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const API_HASH: &str = "0123456789abcdef0123456789abcdef";
pub const SESSION_BLOB: &[u8] = b"upstream-session-blob";

pub fn crypter() -> Crypter {
    Crypter::from_hex(KEY_HEX).expect("test key should be valid")
}

// ---------------------------------------------------------------------------
// Scripted upstream
// ---------------------------------------------------------------------------

/// Responses the fake client hands out. Unset entries fall back to benign
/// defaults.
#[derive(Default)]
pub struct Script {
    pub fail_connect: Option<UpstreamError>,
    pub send_code: Option<Result<String, UpstreamError>>,
    pub sign_in: Option<Result<RawUser, UpstreamError>>,
    /// Popped per `export_login_token`; an empty queue answers "not scanned".
    pub login_tokens: VecDeque<Result<LoginToken, UpstreamError>>,
    pub import_token: Option<Result<LoginToken, UpstreamError>>,
    pub dialogs: DialogsPage,
    pub contacts: ContactsPage,
    pub history: HistoryPage,
    pub users: Vec<RawUser>,
    pub channels: Vec<RawChannel>,
    pub usernames: HashMap<String, ResolvedRaw>,
    pub phones: HashMap<String, ResolvedRaw>,
    pub imported: HashMap<String, RawUser>,
    pub send_error: Option<UpstreamError>,
    /// End the update stream with `Ok` instead of a transport error once the
    /// feed closes.
    pub updates_end_cleanly: bool,
}

/// Everything the fake client was asked to do.
#[derive(Default, Debug)]
pub struct CallLog {
    pub calls: Vec<String>,
    /// Whether each connection carried a stored session.
    pub connects: Vec<bool>,
    pub sent_texts: Vec<(InputPeer, String)>,
    pub sent_media: Vec<(InputPeer, OutgoingMedia)>,
    pub migrated_to: Vec<i32>,
    pub disconnects: usize,
}

#[derive(Default)]
pub struct FakeUpstream {
    pub script: Mutex<Script>,
    pub log: Mutex<CallLog>,
    updates: Mutex<Option<mpsc::UnboundedReceiver<Update>>>,
}

impl FakeUpstream {
    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.log.lock().unwrap().calls.iter().filter(|c| *c == call).count()
    }

    pub fn connects(&self) -> usize {
        self.log.lock().unwrap().connects.len()
    }

    pub fn sent_texts(&self) -> Vec<(InputPeer, String)> {
        self.log.lock().unwrap().sent_texts.clone()
    }

    /// Feed for the next `run_updates`. Dropping the sender ends the stream
    /// with a transport error.
    pub fn update_feed(&self) -> mpsc::UnboundedSender<Update> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.updates.lock().unwrap() = Some(rx);
        tx
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().calls.push(call.to_string());
    }
}

pub struct FakeFactory(pub Arc<FakeUpstream>);

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn connect(
        &self,
        params: ConnectParams<'_>,
    ) -> Result<Box<dyn UpstreamClient>, UpstreamError> {
        assert_eq!(params.api_hash, API_HASH, "credentials must arrive unsealed");
        self.0.log.lock().unwrap().connects.push(params.session.is_some());
        if let Some(e) = self.0.script.lock().unwrap().fail_connect.clone() {
            return Err(e);
        }
        Ok(Box::new(FakeClient(Arc::clone(&self.0))))
    }
}

pub struct FakeClient(Arc<FakeUpstream>);

fn not_found(what: &str) -> UpstreamError {
    UpstreamError::NotFound(what.to_string())
}

#[async_trait]
impl UpstreamClient for FakeClient {
    async fn send_code(&self, _phone: &str) -> Result<String, UpstreamError> {
        self.0.record("send_code");
        self.0
            .script
            .lock()
            .unwrap()
            .send_code
            .clone()
            .unwrap_or_else(|| Ok("HASH1".into()))
    }

    async fn sign_in(
        &self,
        _phone: &str,
        _code: &str,
        _phone_code_hash: &str,
    ) -> Result<RawUser, UpstreamError> {
        self.0.record("sign_in");
        self.0
            .script
            .lock()
            .unwrap()
            .sign_in
            .clone()
            .unwrap_or(Err(UpstreamError::InvalidCode))
    }

    async fn export_login_token(&self) -> Result<LoginToken, UpstreamError> {
        self.0.record("export_login_token");
        self.0
            .script
            .lock()
            .unwrap()
            .login_tokens
            .pop_front()
            .unwrap_or_else(|| {
                Ok(LoginToken::Token {
                    token: b"pending".to_vec(),
                    expires: 0,
                })
            })
    }

    async fn import_login_token(&self, _token: &[u8]) -> Result<LoginToken, UpstreamError> {
        self.0.record("import_login_token");
        self.0
            .script
            .lock()
            .unwrap()
            .import_token
            .clone()
            .unwrap_or_else(|| Err(UpstreamError::Rejected("no import scripted".into())))
    }

    async fn migrate_to(&self, dc_id: i32) -> Result<(), UpstreamError> {
        self.0.record("migrate_to");
        self.0.log.lock().unwrap().migrated_to.push(dc_id);
        Ok(())
    }

    async fn export_session(&self) -> Result<Vec<u8>, UpstreamError> {
        self.0.record("export_session");
        Ok(SESSION_BLOB.to_vec())
    }

    async fn log_out(&self) -> Result<(), UpstreamError> {
        self.0.record("log_out");
        Ok(())
    }

    async fn resolve_username(&self, username: &str) -> Result<ResolvedRaw, UpstreamError> {
        self.0.record("resolve_username");
        let script = self.0.script.lock().unwrap();
        script.usernames.get(username).cloned().ok_or_else(|| not_found(username))
    }

    async fn resolve_phone(&self, phone: &str) -> Result<ResolvedRaw, UpstreamError> {
        self.0.record("resolve_phone");
        let script = self.0.script.lock().unwrap();
        script.phones.get(phone).cloned().ok_or_else(|| not_found(phone))
    }

    async fn import_contact(
        &self,
        phone: &str,
        _first_name: &str,
        _last_name: &str,
    ) -> Result<RawUser, UpstreamError> {
        self.0.record("import_contact");
        let script = self.0.script.lock().unwrap();
        script.imported.get(phone).cloned().ok_or_else(|| not_found(phone))
    }

    async fn get_users(&self, ids: &[i64]) -> Result<Vec<RawUser>, UpstreamError> {
        self.0.record("get_users");
        let script = self.0.script.lock().unwrap();
        Ok(script.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn get_channels(&self, ids: &[i64]) -> Result<Vec<RawChannel>, UpstreamError> {
        self.0.record("get_channels");
        let script = self.0.script.lock().unwrap();
        Ok(script.channels.iter().filter(|c| ids.contains(&c.id)).cloned().collect())
    }

    async fn get_dialogs(&self, _limit: i32) -> Result<DialogsPage, UpstreamError> {
        self.0.record("get_dialogs");
        Ok(self.0.script.lock().unwrap().dialogs.clone())
    }

    async fn get_history(
        &self,
        _peer: &InputPeer,
        query: HistoryQuery,
    ) -> Result<HistoryPage, UpstreamError> {
        self.0.record("get_history");
        let mut page = self.0.script.lock().unwrap().history.clone();
        page.messages.truncate(query.limit.max(0) as usize);
        Ok(page)
    }

    async fn get_contacts(&self) -> Result<ContactsPage, UpstreamError> {
        self.0.record("get_contacts");
        Ok(self.0.script.lock().unwrap().contacts.clone())
    }

    async fn send_text(&self, peer: &InputPeer, text: &str) -> Result<(), UpstreamError> {
        self.0.record("send_text");
        if let Some(e) = self.0.script.lock().unwrap().send_error.clone() {
            return Err(e);
        }
        self.0
            .log
            .lock()
            .unwrap()
            .sent_texts
            .push((*peer, text.to_string()));
        Ok(())
    }

    async fn send_media(
        &self,
        peer: &InputPeer,
        media: &OutgoingMedia,
    ) -> Result<(), UpstreamError> {
        self.0.record("send_media");
        assert!(media.path.exists(), "media file must exist while sending");
        self.0
            .log
            .lock()
            .unwrap()
            .sent_media
            .push((*peer, media.clone()));
        Ok(())
    }

    async fn run_updates(&self, sink: mpsc::Sender<Update>) -> Result<(), UpstreamError> {
        self.0.record("run_updates");
        let feed = self.0.updates.lock().unwrap().take();
        let Some(mut feed) = feed else {
            std::future::pending::<()>().await;
            return Ok(());
        };
        while let Some(update) = feed.recv().await {
            if sink.send(update).await.is_err() {
                return Ok(());
            }
        }
        if self.0.script.lock().unwrap().updates_end_cleanly {
            return Ok(());
        }
        Err(UpstreamError::Transport("connection reset".into()))
    }

    async fn disconnect(&self) {
        self.0.log.lock().unwrap().disconnects += 1;
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<DbId, TelegramSession>>,
    webhooks: Mutex<HashMap<DbId, WebhookConfig>>,
    /// Make `set_auth_state` fail as if the database were unreachable.
    pub fail_state_writes: AtomicBool,
}

fn duplicate() -> sqlx::Error {
    sqlx::Error::Protocol("duplicate key value violates unique constraint".into())
}

impl MemorySessionStore {
    pub fn insert(&self, session: TelegramSession) {
        self.sessions.lock().unwrap().insert(session.id, session);
    }

    pub fn get(&self, id: DbId) -> Option<TelegramSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn insert_webhook(&self, session_id: DbId, url: &str) {
        let now = chrono::Utc::now();
        self.webhooks.lock().unwrap().insert(
            session_id,
            WebhookConfig {
                id: DbId::new_v4(),
                session_id,
                url: url.to_string(),
                secret: None,
                events: Vec::new(),
                is_active: true,
                max_retries: 3,
                timeout_ms: 5000,
                last_error: None,
                last_error_at: None,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, input: &CreateTelegramSession) -> Result<TelegramSession, sqlx::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions
            .values()
            .any(|s| s.user_id == input.user_id && s.phone_number == input.phone_number)
        {
            return Err(duplicate());
        }
        let now = chrono::Utc::now();
        let session = TelegramSession {
            id: DbId::new_v4(),
            user_id: input.user_id,
            phone_number: input.phone_number.clone(),
            api_id: input.api_id,
            api_hash_encrypted: input.api_hash_encrypted.clone(),
            session_name: input.session_name.clone(),
            session_data: Vec::new(),
            auth_state: input.auth_state,
            telegram_user_id: None,
            telegram_username: None,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_by_id(&self, id: DbId) -> Result<Option<TelegramSession>, sqlx::Error> {
        Ok(self.get(id))
    }

    async fn get_by_user_and_phone(
        &self,
        user_id: DbId,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.user_id == user_id && s.phone_number == phone)
            .cloned())
    }

    async fn list_by_user(&self, user_id: DbId) -> Result<Vec<TelegramSession>, sqlx::Error> {
        let mut list: Vec<_> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(list)
    }

    async fn list_active(&self) -> Result<Vec<TelegramSession>, sqlx::Error> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn reset_for_login(
        &self,
        id: DbId,
        input: &CreateTelegramSession,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(s) = sessions.get_mut(&id).filter(|s| !s.is_active) else {
            return Ok(None);
        };
        s.api_id = input.api_id;
        s.api_hash_encrypted = input.api_hash_encrypted.clone();
        s.session_name = input.session_name.clone();
        s.auth_state = input.auth_state;
        s.updated_at = chrono::Utc::now();
        Ok(Some(s.clone()))
    }

    async fn complete_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(s) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        s.session_data = input.session_data.clone();
        s.telegram_user_id = Some(input.telegram_user_id);
        s.telegram_username = input.telegram_username.clone();
        s.auth_state = AuthState::Authenticated;
        s.is_active = true;
        Ok(Some(s.clone()))
    }

    async fn set_auth_state(&self, id: DbId, state: AuthState) -> Result<bool, sqlx::Error> {
        if self.fail_state_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut sessions = self.sessions.lock().unwrap();
        Ok(sessions.get_mut(&id).map(|s| s.auth_state = state).is_some())
    }

    async fn complete_qr_auth(
        &self,
        id: DbId,
        input: &CompleteAuth,
        phone: &str,
    ) -> Result<Option<TelegramSession>, sqlx::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(user_id) = sessions.get(&id).map(|s| s.user_id) else {
            return Ok(None);
        };
        let taken = sessions
            .values()
            .any(|s| s.id != id && s.user_id == user_id && s.phone_number == phone);
        let phone = if taken {
            format!("{phone}-{id}")
        } else {
            phone.to_string()
        };
        let Some(s) = sessions.get_mut(&id) else {
            return Ok(None);
        };
        s.session_data = input.session_data.clone();
        s.telegram_user_id = Some(input.telegram_user_id);
        s.telegram_username = input.telegram_username.clone();
        s.auth_state = AuthState::Authenticated;
        s.is_active = true;
        s.phone_number = phone;
        Ok(Some(s.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        self.webhooks.lock().unwrap().remove(&id);
        Ok(self.sessions.lock().unwrap().remove(&id).is_some())
    }

    async fn get_webhook(&self, session_id: DbId) -> Result<Option<WebhookConfig>, sqlx::Error> {
        Ok(self.webhooks.lock().unwrap().get(&session_id).cloned())
    }

    async fn upsert_webhook(&self, input: &UpsertWebhook) -> Result<WebhookConfig, sqlx::Error> {
        let now = chrono::Utc::now();
        let mut webhooks = self.webhooks.lock().unwrap();
        let created_at = webhooks
            .get(&input.session_id)
            .map_or(now, |w| w.created_at);
        let config = WebhookConfig {
            id: DbId::new_v4(),
            session_id: input.session_id,
            url: input.url.clone(),
            secret: input.secret.clone(),
            events: input.events.clone(),
            is_active: true,
            max_retries: input.max_retries,
            timeout_ms: input.timeout_ms,
            last_error: None,
            last_error_at: None,
            created_at,
            updated_at: now,
        };
        webhooks.insert(input.session_id, config.clone());
        Ok(config)
    }

    async fn delete_webhook(&self, session_id: DbId) -> Result<bool, sqlx::Error> {
        Ok(self.webhooks.lock().unwrap().remove(&session_id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn user(id: i64, username: &str) -> RawUser {
    RawUser {
        id,
        access_hash: id * 10,
        first_name: format!("User{id}"),
        username: username.to_string(),
        ..RawUser::default()
    }
}

/// An authenticated, active record owned by `owner`, sealed with [`crypter`].
pub fn authenticated_session(owner: DbId) -> TelegramSession {
    let c = crypter();
    let now = chrono::Utc::now();
    TelegramSession {
        id: DbId::new_v4(),
        user_id: owner,
        phone_number: "+15550100".into(),
        api_id: 12345,
        api_hash_encrypted: c.seal(API_HASH.as_bytes()).unwrap(),
        session_name: "Work".into(),
        session_data: c.seal(SESSION_BLOB).unwrap(),
        auth_state: AuthState::Authenticated,
        telegram_user_id: Some(777),
        telegram_username: Some("me".into()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Config with short QR timings so paused-clock tests stay readable.
pub fn test_config() -> TelegramConfig {
    TelegramConfig {
        qr_max_attempts: 3,
        qr_timeout: Duration::from_secs(10),
        qr_poll_interval: Duration::from_secs(2),
        qr_first_token_timeout: Duration::from_secs(5),
        ..TelegramConfig::default()
    }
}

/// The session core wired to fakes.
pub struct Harness {
    pub upstream: Arc<FakeUpstream>,
    pub store: Arc<MemorySessionStore>,
    pub cache: Arc<MemoryCache>,
    pub pool: Arc<SessionPool>,
    pub jobs: Arc<JobQueue>,
    pub service: SessionService,
    pub events: EventQueue,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: TelegramConfig) -> Self {
        let upstream = Arc::new(FakeUpstream::default());
        let store = Arc::new(MemorySessionStore::default());
        let cache = Arc::new(MemoryCache::new());
        let connector = Arc::new(Connector::new(
            Arc::new(FakeFactory(Arc::clone(&upstream))),
            crypter(),
        ));
        let (dispatcher, events) = EventDispatcher::new(64);

        let store_dyn: Arc<dyn SessionStore> = store.clone();
        let pool = SessionPool::new(Arc::clone(&connector), Arc::clone(&store_dyn), dispatcher);
        let jobs = JobQueue::new(
            Arc::clone(&connector),
            Arc::clone(&store_dyn),
            cache.clone(),
            &config,
        );
        let service = SessionService::new(
            store_dyn,
            cache.clone(),
            connector,
            Arc::clone(&pool),
            Arc::clone(&jobs),
            config,
        );

        Self {
            upstream,
            store,
            cache,
            pool,
            jobs,
            service,
            events,
        }
    }

    /// Drain every event dispatched so far.
    pub fn drain_events(&mut self) -> Vec<WebhookEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next dispatched event.
    pub async fn next_event(&mut self) -> WebhookEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("event should arrive in time")
            .expect("dispatcher should be open")
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
