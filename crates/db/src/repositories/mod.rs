//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod refresh_token_repo;
pub mod telegram_session_repo;
pub mod user_repo;
pub mod webhook_repo;

pub use refresh_token_repo::RefreshTokenRepo;
pub use telegram_session_repo::TelegramSessionRepo;
pub use user_repo::UserRepo;
pub use webhook_repo::WebhookRepo;
