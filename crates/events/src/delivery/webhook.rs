//! Signed webhook delivery with linear-backoff retry.
//!
//! [`WebhookDelivery`] POSTs a serialized [`WebhookEvent`] to one endpoint.
//! Each attempt has its own timeout; a failed attempt `n` is followed by a
//! sleep of `n × backoff_step` before the next one. No sleep follows the
//! final attempt.

use std::time::Duration;

use tgw_core::signing::signature_header;

use crate::envelope::WebhookEvent;

pub const HEADER_EVENT: &str = "X-Telegram-Event";
pub const HEADER_SESSION: &str = "X-Telegram-Session";
pub const HEADER_DELIVERY: &str = "X-Telegram-Delivery";
pub const HEADER_SIGNATURE: &str = "X-Telegram-Signature";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, per-attempt timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("webhook returned {0}")]
    HttpStatus(u16),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Resolved delivery parameters for one webhook config.
#[derive(Debug, Clone)]
pub struct DeliveryTarget {
    pub url: String,
    pub secret: Option<String>,
    /// Total attempts, at least one.
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_step: Duration,
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers event envelopes to external webhook endpoints.
#[derive(Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }

    /// Deliver `event` to `target`, retrying on transport errors and non-2xx
    /// responses. Returns the number of attempts used on success, or the
    /// last error once every attempt has failed.
    pub async fn deliver(
        &self,
        target: &DeliveryTarget,
        event: &WebhookEvent,
    ) -> Result<u32, WebhookError> {
        let body = serde_json::to_vec(event)?;
        let signature = target
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| signature_header(secret, &body));

        let max_attempts = target.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_send(target, event, &body, signature.as_deref()).await {
                Ok(()) => return Ok(attempt),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        url = %target.url,
                        event_id = %event.id,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(target.backoff_step * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(
        &self,
        target: &DeliveryTarget,
        event: &WebhookEvent,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookError> {
        let mut request = self
            .client
            .post(&target.url)
            .timeout(target.attempt_timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(HEADER_EVENT, &event.event_type)
            .header(HEADER_SESSION, event.session_id.to_string())
            .header(HEADER_DELIVERY, &event.id)
            .body(body.to_vec());
        if let Some(sig) = signature {
            request = request.header(HEADER_SIGNATURE, sig);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(500);
        assert_eq!(err.to_string(), "webhook returned 500");
    }

    #[test]
    fn webhook_error_display_request() {
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = WebhookError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }
}
