//! Webhook event fan-out.
//!
//! - [`WebhookEvent`]: the JSON envelope delivered to webhook endpoints.
//! - [`EventDispatcher`]: non-blocking, drop-on-full enqueue onto a bounded
//!   buffer, drained by a fixed pool of delivery workers.
//! - [`delivery::webhook`]: signed HTTP POST with linear retry.
//! - [`WebhookStore`]: the lookup/failure-recording seam over `webhook_configs`.

pub mod delivery;
pub mod dispatcher;
pub mod envelope;
pub mod store;

pub use delivery::webhook::{DeliveryTarget, WebhookDelivery, WebhookError};
pub use dispatcher::{DispatchError, DispatcherConfig, DispatcherHandle, EventDispatcher, EventQueue};
pub use envelope::WebhookEvent;
pub use store::{PgWebhookStore, WebhookStore};
