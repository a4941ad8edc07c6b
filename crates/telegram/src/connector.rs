//! Opens upstream connections from sealed session records.
//!
//! Credentials are unsealed into [`Credentials`], handed to the factory, and
//! dropped as soon as the connection is established. Nothing decrypted is
//! kept in long-lived state.

use std::sync::Arc;

use tgw_core::crypto::Crypter;
use tgw_db::models::telegram_session::TelegramSession;
use tokio_util::sync::CancellationToken;

use crate::error::TelegramError;
use crate::upstream::{ClientFactory, ConnectParams, ScopedClient};

/// Unsealed connection credentials for one session.
pub struct Credentials {
    api_id: i32,
    api_hash: String,
    session: Option<Vec<u8>>,
    device_model: String,
}

impl Credentials {
    /// Credentials for a login that has no stored session yet.
    pub fn fresh(api_id: i32, api_hash: &str, device_model: &str) -> Self {
        Self {
            api_id,
            api_hash: api_hash.to_string(),
            session: None,
            device_model: device_model.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

pub struct Connector {
    factory: Arc<dyn ClientFactory>,
    crypter: Crypter,
}

impl Connector {
    pub fn new(factory: Arc<dyn ClientFactory>, crypter: Crypter) -> Self {
        Self { factory, crypter }
    }

    pub fn crypter(&self) -> &Crypter {
        &self.crypter
    }

    /// Unseal the API secret and, if present, the session blob of a record.
    pub fn unseal(&self, session: &TelegramSession) -> Result<Credentials, TelegramError> {
        let api_hash = self.crypter.open(&session.api_hash_encrypted)?;
        let api_hash = String::from_utf8(api_hash).map_err(|_| TelegramError::BadCiphertext)?;

        let blob = if session.session_data.is_empty() {
            None
        } else {
            Some(self.crypter.open(&session.session_data)?)
        };

        Ok(Credentials {
            api_id: session.api_id,
            api_hash,
            session: blob,
            device_model: session.session_name.clone(),
        })
    }

    /// Connect with already-unsealed credentials, consuming them.
    pub async fn connect(
        &self,
        credentials: Credentials,
        cancel: CancellationToken,
    ) -> Result<ScopedClient, TelegramError> {
        let params = ConnectParams {
            api_id: credentials.api_id,
            api_hash: &credentials.api_hash,
            session: credentials.session.as_deref(),
            device_model: &credentials.device_model,
        };
        let client = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(TelegramError::Timeout("connect cancelled".into()));
            }
            result = self.factory.connect(params) => result?,
        };
        Ok(ScopedClient::new(client, cancel))
    }

    /// Unseal a record and connect with it.
    pub async fn open(
        &self,
        session: &TelegramSession,
        cancel: CancellationToken,
    ) -> Result<ScopedClient, TelegramError> {
        let credentials = self.unseal(session)?;
        self.connect(credentials, cancel).await
    }
}
