//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?refresh=true` bypasses the read-through cache.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    #[serde(default)]
    pub refresh: bool,
}
