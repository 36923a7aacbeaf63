//! Text clipboard fallback
//!
//! Some programs put images on the clipboard as text: either a
//! `data:image/<fmt>;base64,<payload>` URL or bare base64. These are only
//! consulted after the native adapter reported no image.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{ClipboardError, ClipboardImage};
use crate::sniff::{self, ImageFormat};

static DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:image/(\w+);base64,(.+)$").unwrap());

static BASE64_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());

/// Source of the clipboard's current text
#[async_trait]
pub trait TextClipboard: Send + Sync {
    async fn read_text(&self) -> Result<String, ClipboardError>;
}

/// System text clipboard backed by `arboard`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTextClipboard;

#[async_trait]
impl TextClipboard for SystemTextClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Platform(e.to_string()))?;
            clipboard
                .get_text()
                .map_err(|e| ClipboardError::Platform(e.to_string()))
        })
        .await
        .map_err(|e| ClipboardError::Platform(format!("Clipboard task failed: {}", e)))?
    }
}

/// Parse clipboard text as an encoded image
pub fn parse_text_image(text: &str) -> Option<ClipboardImage> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = DATA_URL.captures(text) {
        let bytes = decode_base64(&captures[2])?;
        if bytes.is_empty() {
            return None;
        }
        let format =
            ImageFormat::from_name(&captures[1]).unwrap_or_else(|| sniff::classify(&bytes));
        debug!("Parsed data URL image: {} bytes, format: {}", bytes.len(), format);
        return Some(ClipboardImage {
            bytes: bytes.into(),
            format,
        });
    }

    let bytes = decode_base64(text)?;
    let format = sniff::detect(&bytes)?;
    debug!("Parsed base64 image: {} bytes, format: {}", bytes.len(), format);
    Some(ClipboardImage {
        bytes: bytes.into(),
        format,
    })
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if !BASE64_TEXT.is_match(&compact) {
        return None;
    }
    STANDARD.decode(compact.as_bytes()).ok()
}
