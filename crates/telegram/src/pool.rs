//! Long-lived upstream connections for sessions that stream events.
//!
//! [`SessionPool`] keeps at most one running client per session. Each entry
//! runs in its own task: connect, stream updates, translate them into
//! webhook events, and hand them to the [`EventDispatcher`]. The map lock is
//! only held across insert/remove; the client run happens outside it.
//!
//! Events for an entry are dispatched while holding the entry's own state
//! lock after checking its cancel token, and [`SessionPool::stop_session`]
//! cancels under that same lock. Once `stop_session` returns, no further
//! event for the session reaches the dispatcher.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use tgw_core::events::{
    MESSAGE_EDIT, MESSAGE_NEW, SESSION_ERROR, SESSION_STARTED, SESSION_STOPPED, USER_TYPING,
};
use tgw_core::types::{DbId, Timestamp};
use tgw_db::models::telegram_session::TelegramSession;
use tgw_events::EventDispatcher;

use crate::connector::{Connector, Credentials};
use crate::error::TelegramError;
use crate::mapping;
use crate::store::SessionStore;
use crate::types::{SessionEventData, TypingEventData};
use crate::upstream::Update;

/// Capacity of the per-session update channel.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// One registered session.
pub struct ActiveSession {
    pub session_id: DbId,
    pub owner_id: DbId,
    pub session_name: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub started_at: Timestamp,
    cancel: CancellationToken,
    state: Mutex<EntryState>,
}

struct EntryState {
    connected: bool,
    last_activity: Timestamp,
}

impl ActiveSession {
    pub fn is_connected(&self) -> bool {
        self.lock_state().connected
    }

    pub fn last_activity(&self) -> Timestamp {
        self.lock_state().last_activity
    }

    pub fn info(&self) -> ActiveSessionInfo {
        let state = self.lock_state();
        ActiveSessionInfo {
            session_id: self.session_id,
            owner_id: self.owner_id,
            session_name: self.session_name.clone(),
            telegram_id: self.telegram_id,
            telegram_username: self.telegram_username.clone(),
            started_at: self.started_at,
            connected: state.connected,
            last_activity: state.last_activity,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn event_data(&self, error: Option<String>) -> SessionEventData {
        SessionEventData {
            session_id: self.session_id,
            session_name: self.session_name.clone(),
            telegram_id: self.telegram_id,
            username: self.telegram_username.clone(),
            error,
        }
    }
}

/// Serializable snapshot of a pool entry.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSessionInfo {
    pub session_id: DbId,
    #[serde(skip)]
    pub owner_id: DbId,
    pub session_name: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub started_at: Timestamp,
    pub connected: bool,
    pub last_activity: Timestamp,
}

pub struct SessionPool {
    sessions: RwLock<HashMap<DbId, Arc<ActiveSession>>>,
    connector: Arc<Connector>,
    store: Arc<dyn SessionStore>,
    dispatcher: EventDispatcher,
    /// Master token; every entry token is a child of it.
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl SessionPool {
    pub fn new(
        connector: Arc<Connector>,
        store: Arc<dyn SessionStore>,
        dispatcher: EventDispatcher,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            connector,
            store,
            dispatcher,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    /// Register `session` and start streaming its updates.
    ///
    /// Returns once the entry is registered. Starting an already-running
    /// session is a no-op. Fails only if the stored credentials cannot be
    /// unsealed.
    pub async fn start_session(
        self: &Arc<Self>,
        session: &TelegramSession,
    ) -> Result<(), TelegramError> {
        if self.sessions.read().await.contains_key(&session.id) {
            return Ok(());
        }

        let credentials = self.connector.unseal(session)?;
        let now = chrono::Utc::now();
        let entry = Arc::new(ActiveSession {
            session_id: session.id,
            owner_id: session.user_id,
            session_name: session.session_name.clone(),
            telegram_id: session.telegram_user_id,
            telegram_username: session.telegram_username.clone(),
            started_at: now,
            cancel: self.cancel.child_token(),
            state: Mutex::new(EntryState {
                connected: false,
                last_activity: now,
            }),
        });

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session.id) {
                return Ok(());
            }
            sessions.insert(session.id, Arc::clone(&entry));
        }

        tracing::info!(session_id = %session.id, "Session added to pool");
        self.dispatcher
            .dispatch(session.id, SESSION_STARTED, &entry.event_data(None));

        let pool = Arc::clone(self);
        self.tasks
            .spawn(async move { pool.run_session(entry, credentials).await });
        Ok(())
    }

    /// Cancel and remove a running session. Returns `false` if it was not
    /// running.
    pub async fn stop_session(&self, session_id: DbId) -> bool {
        let Some(entry) = self.sessions.write().await.remove(&session_id) else {
            return false;
        };

        {
            let mut state = entry.lock_state();
            entry.cancel.cancel();
            state.connected = false;
        }

        tracing::info!(session_id = %session_id, "Session removed from pool");
        self.dispatcher
            .dispatch(session_id, SESSION_STOPPED, &entry.event_data(None));
        true
    }

    pub async fn get_active(&self, session_id: DbId) -> Option<Arc<ActiveSession>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    pub async fn is_active(&self, session_id: DbId) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn list_active(&self) -> Vec<ActiveSessionInfo> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<_> = sessions.values().map(|s| s.info()).collect();
        list.sort_by_key(|s| s.started_at);
        list
    }

    pub async fn list_for_owner(&self, owner_id: DbId) -> Vec<ActiveSessionInfo> {
        self.list_active()
            .await
            .into_iter()
            .filter(|s| s.owner_id == owner_id)
            .collect()
    }

    /// Register every eligible session that has an active webhook.
    ///
    /// Returns the number of sessions started.
    pub async fn start_all_active(self: &Arc<Self>) -> Result<usize, TelegramError> {
        let sessions = self.store.list_active().await?;
        let mut started = 0;

        for session in sessions.iter().filter(|s| s.is_pool_eligible()) {
            match self.store.get_webhook(session.id).await {
                Ok(Some(webhook)) if webhook.is_active => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Webhook lookup failed");
                    continue;
                }
            }
            match self.start_session(session).await {
                Ok(()) => started += 1,
                Err(e) => {
                    tracing::error!(session_id = %session.id, error = %e, "Failed to start session");
                }
            }
        }

        tracing::info!(started, "Active sessions loaded into pool");
        Ok(started)
    }

    /// Cancel every entry and wait up to `budget` for their tasks to end.
    pub async fn shutdown(&self, budget: Duration) {
        tracing::info!("Shutting down session pool");
        self.cancel.cancel();
        self.sessions.write().await.clear();

        self.tasks.close();
        if tokio::time::timeout(budget, self.tasks.wait()).await.is_err() {
            tracing::warn!("Session pool tasks did not stop within budget");
        }
        tracing::info!("Session pool shut down complete");
    }

    // ---- private helpers ----

    async fn run_session(self: Arc<Self>, entry: Arc<ActiveSession>, credentials: Credentials) {
        let session_id = entry.session_id;

        let outcome = match self.connector.connect(credentials, entry.cancel.clone()).await {
            Ok(client) => {
                entry.lock_state().connected = true;
                tracing::info!(session_id = %session_id, "Session connected");

                let (tx, mut rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
                let outcome = {
                    let run = client.call(client.client().run_updates(tx));
                    tokio::pin!(run);
                    loop {
                        tokio::select! {
                            result = &mut run => break result,
                            Some(update) = rx.recv() => self.handle_update(&entry, update),
                        }
                    }
                };
                while let Ok(update) = rx.try_recv() {
                    self.handle_update(&entry, update);
                }
                client.close().await;
                outcome.map_err(TelegramError::from)
            }
            Err(e) => Err(e),
        };

        if entry.cancel.is_cancelled() {
            tracing::debug!(session_id = %session_id, "Session run ended after stop");
            return;
        }

        let error = outcome.err().map(|e| e.to_string());
        match &error {
            Some(message) => {
                tracing::error!(session_id = %session_id, error = %message, "Session run failed");
            }
            None => tracing::info!(session_id = %session_id, "Session update stream ended"),
        }

        {
            let mut state = entry.lock_state();
            if entry.cancel.is_cancelled() {
                return;
            }
            state.connected = false;
            if let Some(message) = error {
                self.dispatcher.dispatch(
                    session_id,
                    SESSION_ERROR,
                    &entry.event_data(Some(message)),
                );
            }
            entry.cancel.cancel();
        }

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &entry))
        {
            sessions.remove(&session_id);
        }
    }

    /// Translate one update into at most one event. Panics are contained
    /// to the update that caused them.
    fn handle_update(&self, entry: &ActiveSession, update: Update) {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut state = entry.lock_state();
            if entry.cancel.is_cancelled() {
                return;
            }
            state.last_activity = chrono::Utc::now();
            self.dispatch_update(entry.session_id, update);
        }));
        if result.is_err() {
            tracing::error!(session_id = %entry.session_id, "Update handler panicked");
        }
    }

    fn dispatch_update(&self, session_id: DbId, update: Update) {
        match update {
            Update::NewMessage { message, entities } => {
                if message.out {
                    return;
                }
                let data = mapping::message_event(&message, &entities);
                self.dispatcher.dispatch(session_id, MESSAGE_NEW, &data);
            }
            Update::EditMessage { message, entities } => {
                let data = mapping::message_event(&message, &entities);
                self.dispatcher.dispatch(session_id, MESSAGE_EDIT, &data);
            }
            Update::UserTyping { user_id } => {
                let data = TypingEventData {
                    chat_id: user_id,
                    user_id,
                    username: None,
                    action: "typing".into(),
                };
                self.dispatcher.dispatch(session_id, USER_TYPING, &data);
            }
            Update::UserStatus { user_id, status } => {
                if let Some((event_type, data)) = mapping::status_event(user_id, &status) {
                    self.dispatcher.dispatch(session_id, event_type, &data);
                }
            }
        }
    }
}

