//! HTTP handlers, one module per resource.

pub mod auth;
pub mod chats;
pub mod messages;
pub mod sessions;
pub mod webhooks;
