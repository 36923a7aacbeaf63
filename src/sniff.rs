//! Image format detection from magic-number signatures
//!
//! Classification never fails: bytes that carry no known signature are
//! treated as PNG so a paste is never blocked on format ambiguity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Image formats recognized on the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
}

impl ImageFormat {
    /// File extension used when saving, without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
        }
    }

    /// Parse a format name such as the subtype of a `data:image/...` URL
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_MAGIC: &[u8] = b"GIF";
const BMP_MAGIC: &[u8] = b"BM";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_MAGIC: &[u8] = b"WEBP";

/// Detect the format of `bytes`, or `None` if no known signature matches.
///
/// Buffers shorter than four bytes never match.
pub fn detect(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.len() < 4 {
        return None;
    }

    if bytes.starts_with(PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(GIF_MAGIC) {
        Some(ImageFormat::Gif)
    } else if bytes.starts_with(BMP_MAGIC) {
        Some(ImageFormat::Bmp)
    } else if bytes.starts_with(RIFF_MAGIC) && bytes.len() >= 12 && &bytes[8..12] == WEBP_MAGIC {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// Classify `bytes`, defaulting to PNG
pub fn classify(bytes: &[u8]) -> ImageFormat {
    detect(bytes).unwrap_or(ImageFormat::Png)
}

/// Whether `bytes` start with a known image signature
pub fn is_image(bytes: &[u8]) -> bool {
    detect(bytes).is_some()
}
