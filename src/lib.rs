//! # PasteMark
//!
//! Paste clipboard images into Markdown documents.
//!
//! PasteMark reads the image currently on the system clipboard (macOS,
//! Linux, Windows, and WSL), picks a file name for it from the selected
//! text, a local image-understanding service, or a timestamp, saves it next
//! to the document, and inserts a Markdown image reference.

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod naming;
pub mod notify;
pub mod paste;
pub mod sniff;

pub use config::Config;

/// Result type alias for PasteMark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PasteMark operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Clipboard operation error
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] clipboard::ClipboardError),

    /// Naming service error
    #[error("Naming error: {0}")]
    Naming(#[from] naming::NamingError),

    /// Paste error
    #[error(transparent)]
    Paste(#[from] paste::PasteError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum clipboard image size (10MB default)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;
