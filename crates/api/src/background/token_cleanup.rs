//! Hourly purge of expired and revoked refresh tokens.

use std::time::Duration;

use tgw_db::repositories::RefreshTokenRepo;
use tgw_db::DbPool;
use tokio_util::sync::CancellationToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the purge loop until `cancel` fires. The first pass runs immediately.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Refresh token cleanup started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Refresh token cleanup stopping");
                break;
            }
            _ = interval.tick() => {
                match RefreshTokenRepo::delete_expired(&pool).await {
                    Ok(0) => tracing::debug!("Refresh token cleanup: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Refresh token cleanup: purged tokens"),
                    Err(e) => tracing::error!(error = %e, "Refresh token cleanup failed"),
                }
            }
        }
    }
}
