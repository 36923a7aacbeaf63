//! Clipboard image acquisition
//!
//! This module provides one contract for reading an image from the system
//! clipboard, with adapters for macOS, Linux (X11 and Wayland), Windows, and
//! Windows Subsystem for Linux. Each adapter shells out to a small helper
//! script that writes the image into a temp file; the [`manager`] picks the
//! adapter for the running environment and adds a text-clipboard fallback.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ClipboardConfig;
use crate::sniff::{self, ImageFormat};

pub mod helper;
pub mod linux;
pub mod macos;
pub mod manager;
pub mod text;
pub mod windows;
pub mod wsl;

pub use manager::ClipboardManager;

/// Image bytes read from the clipboard, tagged with their format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    /// Raw encoded image data
    pub bytes: Bytes,
    /// Format detected from the data's signature
    pub format: ImageFormat,
}

impl ClipboardImage {
    /// Wrap `bytes`, classifying them by signature
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let format = sniff::classify(&bytes);
        Self { bytes, format }
    }

    /// Size of the image data in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Capability shared by every clipboard adapter and by the manager.
///
/// `has_image` and `get_image` never fail: helper crashes, timeouts and
/// unreadable temp files are logged and reported as "no image".
#[async_trait]
pub trait ImageClipboard: Send + Sync {
    /// Whether the clipboard currently holds an image
    async fn has_image(&self) -> bool;

    /// Read the clipboard image, if any
    async fn get_image(&self) -> Option<ClipboardImage>;

    /// Delete temp files created while reading images
    async fn cleanup(&self);

    /// Adapter name for diagnostics
    fn name(&self) -> &str;
}

/// Clipboard errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// The running platform has no clipboard adapter
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Helper process did not finish in time and was killed
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// Helper process exited with an unexpected status
    #[error("{program} exited with {status}: {stderr}")]
    HelperFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Temp file announced by the helper does not exist
    #[error("Temp file not found: {0}")]
    TempFileMissing(PathBuf),

    /// Platform clipboard API error
    #[error("Platform error: {0}")]
    Platform(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime environment that decides which adapter is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    MacOS,
    Linux,
    Windows,
    /// Linux running on top of Windows; the clipboard belongs to Windows
    Wsl { distro: Option<String> },
}

impl Environment {
    /// Probe the current process environment
    pub fn detect() -> Result<Self, ClipboardError> {
        Self::detect_with(
            std::env::consts::OS,
            |key| std::env::var(key).ok(),
            || std::fs::read_to_string("/proc/version").ok(),
        )
    }

    /// Probe with explicit inputs.
    ///
    /// Checks in order:
    /// 1. `WSL_DISTRO_NAME` / `WSL_INTEROP` environment variables
    /// 2. kernel version text containing "microsoft"
    /// 3. the target operating system
    pub fn detect_with<E, K>(os: &str, env: E, kernel_version: K) -> Result<Self, ClipboardError>
    where
        E: Fn(&str) -> Option<String>,
        K: FnOnce() -> Option<String>,
    {
        let distro = env("WSL_DISTRO_NAME");
        if distro.is_some() || env("WSL_INTEROP").is_some() {
            return Ok(Environment::Wsl { distro });
        }

        if let Some(version) = kernel_version() {
            if version.to_lowercase().contains("microsoft") {
                return Ok(Environment::Wsl { distro: None });
            }
        }

        match os {
            "macos" => Ok(Environment::MacOS),
            "linux" => Ok(Environment::Linux),
            "windows" => Ok(Environment::Windows),
            other => Err(ClipboardError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Human-readable platform name
    pub fn display_name(&self) -> String {
        match self {
            Environment::MacOS => "macOS".to_string(),
            Environment::Linux => "Linux".to_string(),
            Environment::Windows => "Windows".to_string(),
            Environment::Wsl { distro } => {
                format!("WSL ({})", distro.as_deref().unwrap_or("Unknown"))
            }
        }
    }
}

/// The four platform adapters
pub enum PlatformClipboard {
    MacOS(macos::MacOSClipboard),
    Linux(linux::LinuxClipboard),
    Windows(windows::WindowsClipboard),
    Wsl(wsl::WslClipboard),
}

impl PlatformClipboard {
    /// Build the adapter for `environment`, materializing its helper script
    pub async fn for_environment(
        environment: &Environment,
        config: &ClipboardConfig,
    ) -> Result<Self, ClipboardError> {
        let timeout = config.helper_timeout();
        let script_dir = config.script_dir.as_deref();

        let adapter = match environment {
            Environment::MacOS => {
                let script = helper::HelperScript::MacOS.locate(script_dir).await?;
                PlatformClipboard::MacOS(macos::MacOSClipboard::new(script, timeout))
            }
            Environment::Linux => {
                let script = helper::HelperScript::Linux.locate(script_dir).await?;
                PlatformClipboard::Linux(linux::LinuxClipboard::new(script, timeout))
            }
            Environment::Windows => {
                let script = helper::HelperScript::Windows.locate(script_dir).await?;
                PlatformClipboard::Windows(windows::WindowsClipboard::new(
                    script.display().to_string(),
                    timeout,
                ))
            }
            Environment::Wsl { .. } => {
                let script = helper::HelperScript::Windows.locate(script_dir).await?;
                PlatformClipboard::Wsl(wsl::WslClipboard::new(&script, timeout).await)
            }
        };

        debug!(adapter = adapter.name(), "Selected clipboard adapter");
        Ok(adapter)
    }

    fn inner(&self) -> &dyn ImageClipboard {
        match self {
            PlatformClipboard::MacOS(adapter) => adapter,
            PlatformClipboard::Linux(adapter) => adapter,
            PlatformClipboard::Windows(adapter) => adapter,
            PlatformClipboard::Wsl(adapter) => adapter,
        }
    }
}

#[async_trait]
impl ImageClipboard for PlatformClipboard {
    async fn has_image(&self) -> bool {
        self.inner().has_image().await
    }

    async fn get_image(&self) -> Option<ClipboardImage> {
        self.inner().get_image().await
    }

    async fn cleanup(&self) {
        self.inner().cleanup().await
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}
