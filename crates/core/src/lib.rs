//! Domain primitives shared by every gateway crate.
//!
//! Nothing in here touches the network, the database, or the cache; the
//! modules are plain functions and types so the storage, dispatch, and HTTP
//! layers can all depend on them.

pub mod cache_keys;
pub mod crypto;
pub mod error;
pub mod events;
pub mod messages;
pub mod pagination;
pub mod recipient;
pub mod roles;
pub mod signing;
pub mod types;
