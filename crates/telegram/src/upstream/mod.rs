//! Seam to the upstream protocol library.
//!
//! A [`ClientFactory`] turns credentials plus an optional session blob into a
//! connected [`UpstreamClient`]. Deployments plug in the factory for the
//! protocol library they ship; the gateway only talks to these traits.

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod scoped;
pub mod types;
pub mod unconfigured;

pub use scoped::ScopedClient;
pub use types::*;
pub use unconfigured::UnconfiguredClientFactory;

/// Failure reported by the protocol library.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream rejected the request: {0}")]
    Rejected(String),

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired")]
    CodeExpired,

    #[error("two-factor password required")]
    PasswordRequired,

    #[error("flood wait: retry after {0}s")]
    FloodWait(u32),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Credentials for one connection. Plaintext lives only as long as this value.
pub struct ConnectParams<'a> {
    pub api_id: i32,
    pub api_hash: &'a str,
    /// Serialized session from a previous login, if any.
    pub session: Option<&'a [u8]>,
    pub device_model: &'a str,
}

#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        params: ConnectParams<'_>,
    ) -> Result<Box<dyn UpstreamClient>, UpstreamError>;
}

/// A connected protocol client.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    // ---- login ----

    /// Request a login code; returns the phone-code-hash.
    async fn send_code(&self, phone: &str) -> Result<String, UpstreamError>;

    async fn sign_in(
        &self,
        phone: &str,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<RawUser, UpstreamError>;

    async fn export_login_token(&self) -> Result<LoginToken, UpstreamError>;

    async fn import_login_token(&self, token: &[u8]) -> Result<LoginToken, UpstreamError>;

    /// Switch the connection to data center `dc_id`.
    async fn migrate_to(&self, dc_id: i32) -> Result<(), UpstreamError>;

    /// Serialize the current authorisation so it can be resumed later.
    async fn export_session(&self) -> Result<Vec<u8>, UpstreamError>;

    async fn log_out(&self) -> Result<(), UpstreamError>;

    // ---- lookups ----

    async fn resolve_username(&self, username: &str) -> Result<ResolvedRaw, UpstreamError>;

    async fn resolve_phone(&self, phone: &str) -> Result<ResolvedRaw, UpstreamError>;

    /// Import a phone number as a contact and return the matching user.
    async fn import_contact(
        &self,
        phone: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<RawUser, UpstreamError>;

    async fn get_users(&self, ids: &[i64]) -> Result<Vec<RawUser>, UpstreamError>;

    async fn get_channels(&self, ids: &[i64]) -> Result<Vec<RawChannel>, UpstreamError>;

    async fn get_dialogs(&self, limit: i32) -> Result<DialogsPage, UpstreamError>;

    async fn get_history(
        &self,
        peer: &InputPeer,
        query: HistoryQuery,
    ) -> Result<HistoryPage, UpstreamError>;

    async fn get_contacts(&self) -> Result<ContactsPage, UpstreamError>;

    // ---- sending ----

    async fn send_text(&self, peer: &InputPeer, text: &str) -> Result<(), UpstreamError>;

    async fn send_media(&self, peer: &InputPeer, media: &OutgoingMedia)
        -> Result<(), UpstreamError>;

    // ---- streaming ----

    /// Push updates into `sink` until the connection ends.
    async fn run_updates(&self, sink: mpsc::Sender<Update>) -> Result<(), UpstreamError>;

    async fn disconnect(&self);
}
