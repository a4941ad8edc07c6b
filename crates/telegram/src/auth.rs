//! Login flows: SMS code and QR token.
//!
//! Both flows end in an [`AuthOutcome`]: the upstream identity plus the
//! session blob, already sealed for storage. The driver owns its client for
//! the whole flow and disconnects it when the flow resolves.
//!
//! The QR flow outlives the HTTP request that started it.
//! [`AuthDriver::start_qr`] returns as soon as the first token is rendered,
//! handing back a single-shot receiver for the final outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tgw_db::models::telegram_session::TelegramSession;

use crate::connector::{Connector, Credentials};
use crate::error::TelegramError;
use crate::qr;
use crate::upstream::{LoginToken, RawUser, ScopedClient, UpstreamError};

/// Identity and sealed session blob of a completed login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub telegram_user_id: i64,
    pub telegram_username: Option<String>,
    pub sealed_session: Vec<u8>,
}

/// QR flow knobs.
#[derive(Debug, Clone)]
pub struct QrSettings {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub poll_interval: Duration,
    pub first_token_timeout: Duration,
}

/// The first QR of a login, returned synchronously to the caller.
#[derive(Debug, Clone)]
pub struct QrImage {
    pub png_base64: String,
    pub url: String,
}

/// A running QR login.
pub struct QrLogin {
    /// `None` when the upstream authorised the client before any token
    /// had to be shown.
    pub image: Option<QrImage>,
    pub outcome: oneshot::Receiver<Result<AuthOutcome, TelegramError>>,
}

type FirstSignal = oneshot::Sender<Result<Option<QrImage>, TelegramError>>;

pub struct AuthDriver {
    connector: Arc<Connector>,
    qr: QrSettings,
}

impl AuthDriver {
    pub fn new(connector: Arc<Connector>, qr: QrSettings) -> Self {
        Self { connector, qr }
    }

    // -----------------------------------------------------------------------
    // SMS
    // -----------------------------------------------------------------------

    /// Ask the upstream to send a login code. Returns the phone-code-hash.
    pub async fn start_sms(
        &self,
        api_id: i32,
        api_hash: &str,
        phone: &str,
        device_model: &str,
    ) -> Result<String, TelegramError> {
        let client = self
            .connector
            .connect(
                Credentials::fresh(api_id, api_hash, device_model),
                CancellationToken::new(),
            )
            .await?;
        let result = client.call(client.client().send_code(phone)).await;
        client.close().await;
        Ok(result?)
    }

    /// Submit the code for a record whose SMS login was started.
    pub async fn complete_sms(
        &self,
        session: &TelegramSession,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<AuthOutcome, TelegramError> {
        let client = self
            .connector
            .open(session, CancellationToken::new())
            .await?;
        let result: Result<AuthOutcome, TelegramError> = async {
            let user = client
                .call(
                    client
                        .client()
                        .sign_in(&session.phone_number, code, phone_code_hash),
                )
                .await?;
            self.seal_outcome(&client, user).await
        }
        .await;
        client.close().await;
        result
    }

    // -----------------------------------------------------------------------
    // QR
    // -----------------------------------------------------------------------

    /// Start a QR login and wait for its first token.
    ///
    /// The poll loop keeps running in the background under `cancel` until
    /// the login succeeds, every attempt expires, or `cancel` fires.
    pub async fn start_qr(
        &self,
        api_id: i32,
        api_hash: &str,
        device_model: &str,
        cancel: CancellationToken,
    ) -> Result<QrLogin, TelegramError> {
        let client = self
            .connector
            .connect(Credentials::fresh(api_id, api_hash, device_model), cancel)
            .await?;

        let (first_tx, first_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let flow = QrFlow {
            client,
            connector: Arc::clone(&self.connector),
            settings: self.qr.clone(),
        };
        tokio::spawn(async move {
            let outcome = flow.run(first_tx).await;
            let _ = done_tx.send(outcome);
        });

        let image = match tokio::time::timeout(self.qr.first_token_timeout, first_rx).await {
            Ok(Ok(first)) => first?,
            Ok(Err(_)) => {
                return Err(TelegramError::Internal("QR login task ended early".into()));
            }
            Err(_) => {
                return Err(TelegramError::Timeout(
                    "no login token from upstream".into(),
                ));
            }
        };

        Ok(QrLogin {
            image,
            outcome: done_rx,
        })
    }

    async fn seal_outcome(
        &self,
        client: &ScopedClient,
        user: RawUser,
    ) -> Result<AuthOutcome, TelegramError> {
        seal_outcome(&self.connector, client, user).await
    }
}

async fn seal_outcome(
    connector: &Connector,
    client: &ScopedClient,
    user: RawUser,
) -> Result<AuthOutcome, TelegramError> {
    let blob = client.call(client.client().export_session()).await?;
    let sealed_session = connector.crypter().seal(&blob)?;
    Ok(AuthOutcome {
        telegram_user_id: user.id,
        telegram_username: (!user.username.is_empty()).then_some(user.username),
        sealed_session,
    })
}

// ---------------------------------------------------------------------------
// QR poll loop
// ---------------------------------------------------------------------------

struct QrFlow {
    client: ScopedClient,
    connector: Arc<Connector>,
    settings: QrSettings,
}

impl QrFlow {
    async fn run(self, first: FirstSignal) -> Result<AuthOutcome, TelegramError> {
        let mut first = Some(first);
        let result = match self.attempts(&mut first).await {
            Ok(user) => seal_outcome(&self.connector, &self.client, user).await,
            Err(e) => Err(e),
        };
        if let Some(tx) = first.take() {
            // Authorised without ever showing a token.
            let _ = tx.send(Ok(None));
        }
        self.client.close().await;

        match &result {
            Ok(outcome) => tracing::info!(
                telegram_user_id = outcome.telegram_user_id,
                "QR login completed"
            ),
            Err(e) => tracing::warn!(error = %e, "QR login ended without success"),
        }
        result
    }

    async fn attempts(&self, first: &mut Option<FirstSignal>) -> Result<RawUser, TelegramError> {
        let client = &self.client;

        for attempt in 1..=self.settings.max_attempts {
            let token = match client.call(client.client().export_login_token()).await {
                Ok(token) => token,
                Err(e) => {
                    if let Some(tx) = first.take() {
                        let _ = tx.send(Err(e.clone().into()));
                        return Err(e.into());
                    }
                    if e == UpstreamError::Cancelled {
                        return Err(e.into());
                    }
                    tracing::warn!(attempt, error = %e, "Login token export failed");
                    continue;
                }
            };

            let token = match token {
                LoginToken::Success { user } => return Ok(user),
                LoginToken::MigrateTo { dc_id, token } => {
                    if let Some(user) = self.migrate_and_import(dc_id, &token).await {
                        return Ok(user);
                    }
                    continue;
                }
                LoginToken::Token { token, .. } => token,
            };

            let url = qr::login_url(&token);
            match first.take() {
                Some(tx) => {
                    let image = qr::render_png_base64(&url).map(|png_base64| {
                        Some(QrImage {
                            png_base64,
                            url: url.clone(),
                        })
                    });
                    let failed = image.is_err();
                    let _ = tx.send(image);
                    if failed {
                        return Err(TelegramError::Internal("QR rendering failed".into()));
                    }
                }
                None => match qr::render_terminal(&url) {
                    Ok(art) => tracing::info!(attempt, "New login QR issued:\n{art}"),
                    Err(e) => tracing::warn!(attempt, error = %e, "Failed to render login QR"),
                },
            }

            let deadline = Instant::now() + self.settings.attempt_timeout;
            if let Some(user) = self.poll_until(deadline).await? {
                return Ok(user);
            }
            tracing::info!(attempt, "Login QR expired");
        }

        Err(TelegramError::QrExpired("max QR attempts reached".into()))
    }

    /// Poll the token state every interval until `deadline`.
    async fn poll_until(&self, deadline: Instant) -> Result<Option<RawUser>, TelegramError> {
        let client = &self.client;
        loop {
            let tick = Instant::now() + self.settings.poll_interval;
            if tick >= deadline {
                tokio::select! {
                    _ = client.cancel_token().cancelled() => return Err(UpstreamError::Cancelled.into()),
                    _ = tokio::time::sleep_until(deadline) => return Ok(None),
                }
            }
            tokio::select! {
                _ = client.cancel_token().cancelled() => return Err(UpstreamError::Cancelled.into()),
                _ = tokio::time::sleep_until(tick) => {}
            }

            match client.call(client.client().export_login_token()).await {
                Ok(LoginToken::Token { .. }) => {}
                Ok(LoginToken::Success { user }) => return Ok(Some(user)),
                Ok(LoginToken::MigrateTo { dc_id, token }) => {
                    if let Some(user) = self.migrate_and_import(dc_id, &token).await {
                        return Ok(Some(user));
                    }
                }
                Err(UpstreamError::Cancelled) => return Err(UpstreamError::Cancelled.into()),
                Err(e) => tracing::debug!(error = %e, "Login token poll failed"),
            }
        }
    }

    /// Move to the data center that accepted the token, then import it there.
    async fn migrate_and_import(&self, dc_id: i32, token: &[u8]) -> Option<RawUser> {
        let client = &self.client;
        if let Err(e) = client.call(client.client().migrate_to(dc_id)).await {
            tracing::warn!(dc_id, error = %e, "Data center migration failed");
            return None;
        }
        match client.call(client.client().import_login_token(token)).await {
            Ok(LoginToken::Success { user }) => Some(user),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(dc_id, error = %e, "Login token import failed");
                None
            }
        }
    }
}
