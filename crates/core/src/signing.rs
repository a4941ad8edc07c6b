//! Webhook HMAC signing.
//!
//! Outbound webhook bodies are signed with the per-webhook secret so the
//! receiver can verify origin. The header value is `sha256=<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Telegram-Signature` header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the hex-encoded HMAC-SHA256 of `payload` keyed by `secret`.
pub fn compute_webhook_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Build the full signature header value for a payload.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", compute_webhook_hmac(secret, payload))
}
