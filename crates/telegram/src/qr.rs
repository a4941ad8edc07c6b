//! QR rendering for login tokens.

use std::io::Cursor;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};

use crate::error::TelegramError;

/// Minimum edge of the rendered PNG, in pixels.
pub const PNG_MIN_SIZE: u32 = 256;

/// Login URL for a token, to be scanned by an already logged-in app.
pub fn login_url(token: &[u8]) -> String {
    format!("tg://login?token={}", URL_SAFE.encode(token))
}

/// Render `url` as a PNG and return it base64 encoded.
pub fn render_png_base64(url: &str) -> Result<String, TelegramError> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::M)
        .map_err(|e| TelegramError::Internal(format!("QR encode failed: {e}")))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(PNG_MIN_SIZE, PNG_MIN_SIZE)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| TelegramError::Internal(format!("PNG encode failed: {e}")))?;
    Ok(STANDARD.encode(png))
}

/// Render `url` as block characters for the process log.
pub fn render_terminal(url: &str) -> Result<String, TelegramError> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|e| TelegramError::Internal(format!("QR encode failed: {e}")))?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}
