//! Session lifecycle and dispatch core.
//!
//! Drives logins against the upstream chat protocol, keeps long-lived
//! connections for sessions that stream events to webhooks, queues outbound
//! messages as jobs, and serves read-through cached chat/contact lookups.
//! The protocol library itself is consumed through the traits in
//! [`upstream`].

pub mod auth;
pub mod cache;
pub mod chats;
pub mod config;
pub mod connector;
pub mod error;
pub mod jobs;
pub mod mapping;
pub mod pool;
pub mod qr;
pub mod sessions;
pub mod store;
pub mod types;
pub mod upstream;

pub use config::{CacheTtls, TelegramConfig};
pub use error::TelegramError;
