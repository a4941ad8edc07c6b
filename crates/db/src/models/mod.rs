//! Row structs and insert DTOs.
//!
//! Each submodule holds a `FromRow` entity struct matching its table and a
//! plain create DTO for inserts.

pub mod refresh_token;
pub mod telegram_session;
pub mod user;
pub mod webhook;
