//! Wiring of the session runtime.
//!
//! [`Engine::start`] builds the connector, pool, job queue, and session
//! service around one event dispatcher, spawns the delivery workers, and
//! registers every eligible session with the pool. [`Engine::shutdown`]
//! tears the same pieces down in reverse.

use std::sync::Arc;
use std::time::Duration;

use tgw_core::crypto::Crypter;
use tgw_db::DbPool;
use tgw_events::{
    DispatcherConfig, DispatcherHandle, EventDispatcher, PgWebhookStore, WebhookDelivery,
};
use tgw_telegram::cache::{KeyValueCache, MemoryCache, RedisCache};
use tgw_telegram::connector::Connector;
use tgw_telegram::jobs::JobQueue;
use tgw_telegram::pool::SessionPool;
use tgw_telegram::sessions::SessionService;
use tgw_telegram::store::{PgSessionStore, SessionStore};
use tgw_telegram::upstream::ClientFactory;
use tgw_telegram::TelegramConfig;
use tokio_util::sync::CancellationToken;

use crate::config::InfraConfig;

/// The running session core and its background workers.
pub struct Engine {
    pub sessions: Arc<SessionService>,
    pool: Arc<SessionPool>,
    jobs: Arc<JobQueue>,
    dispatcher: DispatcherHandle,
}

impl Engine {
    /// Build the core and spawn the dispatcher workers.
    ///
    /// Does not touch the upstream; call [`Engine::resume_listening`] once
    /// the server is ready to stream events.
    pub fn start(
        db: DbPool,
        cache: Arc<dyn KeyValueCache>,
        factory: Arc<dyn ClientFactory>,
        crypter: Crypter,
        telegram: TelegramConfig,
        dispatcher_config: DispatcherConfig,
    ) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(db.clone()));
        let connector = Arc::new(Connector::new(factory, crypter));

        let (dispatcher, queue) = EventDispatcher::new(dispatcher_config.buffer_size);
        let dispatcher_handle = EventDispatcher::spawn_workers(
            queue,
            Arc::new(PgWebhookStore::new(db)),
            WebhookDelivery::new(),
            dispatcher_config,
            CancellationToken::new(),
        );

        let pool = SessionPool::new(Arc::clone(&connector), Arc::clone(&store), dispatcher);
        let jobs = JobQueue::new(
            Arc::clone(&connector),
            Arc::clone(&store),
            Arc::clone(&cache),
            &telegram,
        );
        let sessions = Arc::new(SessionService::new(
            store,
            cache,
            connector,
            Arc::clone(&pool),
            Arc::clone(&jobs),
            telegram,
        ));

        Self {
            sessions,
            pool,
            jobs,
            dispatcher: dispatcher_handle,
        }
    }

    /// Register every eligible session that has an active webhook.
    pub async fn resume_listening(&self) {
        match self.pool.start_all_active().await {
            Ok(started) => tracing::info!(started, "Resumed listening sessions"),
            Err(e) => tracing::error!(error = %e, "Failed to resume listening sessions"),
        }
    }

    /// Stop the pool, cancel detached jobs and logins, then drain the
    /// dispatcher. Each stage gets up to `budget`.
    pub async fn shutdown(self, budget: Duration) {
        self.pool.shutdown(budget).await;
        self.jobs.shutdown(budget).await;
        self.sessions.shutdown(budget).await;
        self.dispatcher.shutdown(budget).await;
        tracing::info!("Session engine stopped");
    }
}

/// Redis when `REDIS_URL` is set, otherwise the in-process cache.
///
/// # Panics
///
/// Panics if the Redis URL is malformed.
pub fn build_cache(infra: &InfraConfig) -> Arc<dyn KeyValueCache> {
    match &infra.redis_url {
        Some(url) => {
            let pool = tgw_db::redis::create_redis_pool(url, infra.redis_pool_size)
                .expect("REDIS_URL must be a valid redis URL");
            Arc::new(RedisCache::new(pool))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}
