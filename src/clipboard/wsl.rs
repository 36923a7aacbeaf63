//! WSL clipboard adapter
//!
//! Inside WSL the clipboard belongs to Windows, so this adapter drives the
//! Windows PowerShell helper and translates paths in both directions:
//! the script path into Windows syntax before the call, and the temp file
//! path back into WSL syntax after it.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::helper::HelperOutput;
use super::windows::WindowsClipboard;
use super::{ClipboardImage, ImageClipboard};

static DRIVE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]):\\(.*)$").unwrap());

/// How long a `wslpath` fallback may take
const WSLPATH_TIMEOUT: Duration = Duration::from_secs(2);

/// Clipboard adapter for Linux running under WSL
pub struct WslClipboard {
    windows: WindowsClipboard,
}

impl WslClipboard {
    /// Build the adapter for a helper script stored at `script` (WSL path)
    pub async fn new(script: &Path, timeout: Duration) -> Self {
        let script = to_windows_path(&script.display().to_string()).await;
        debug!("WSL helper script path: {}", script);
        Self {
            windows: WindowsClipboard::new(script, timeout),
        }
    }

    async fn query(&self) -> Result<HelperOutput, super::ClipboardError> {
        match self.windows.query().await? {
            HelperOutput::ImagePath(path) => {
                let translated = to_wsl_path(&path).await;
                debug!("Translated {} to {}", path, translated.display());
                Ok(HelperOutput::ImagePath(translated.display().to_string()))
            }
            other => Ok(other),
        }
    }
}

#[async_trait]
impl ImageClipboard for WslClipboard {
    async fn has_image(&self) -> bool {
        let answer = self.query().await;
        self.windows.scripted().answer_has_image(answer)
    }

    async fn get_image(&self) -> Option<ClipboardImage> {
        let answer = self.query().await;
        let image = self.windows.scripted().answer_image(answer).await;
        if image.is_some() {
            debug!("Got image from Windows clipboard in WSL");
        }
        image
    }

    async fn cleanup(&self) {
        self.windows.cleanup().await
    }

    fn name(&self) -> &str {
        "WSL"
    }
}

/// Rewrite `/mnt/<drive>/rest` to `<DRIVE>:\rest`
pub fn rewrite_to_windows(wsl_path: &str) -> Option<String> {
    let rest = wsl_path.strip_prefix("/mnt/")?;
    let (drive, tail) = rest.split_once('/')?;

    let mut chars = drive.chars();
    let letter = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    if chars.next().is_some() {
        return None;
    }

    Some(format!(
        "{}:\\{}",
        letter.to_ascii_uppercase(),
        tail.replace('/', "\\")
    ))
}

/// Rewrite `<drive>:\rest` to `/mnt/<drive>/rest`
pub fn rewrite_to_wsl(windows_path: &str) -> Option<PathBuf> {
    let captures = DRIVE_PATH.captures(windows_path)?;
    let drive = captures[1].to_ascii_lowercase();
    let tail = captures[2].replace('\\', "/");
    Some(PathBuf::from(format!("/mnt/{}/{}", drive, tail)))
}

/// Translate a WSL path for Windows, falling back to `wslpath -w`
pub async fn to_windows_path(wsl_path: &str) -> String {
    if let Some(path) = rewrite_to_windows(wsl_path) {
        return path;
    }
    wslpath("-w", wsl_path)
        .await
        .unwrap_or_else(|| wsl_path.to_string())
}

/// Translate a Windows path for WSL, falling back to `wslpath -u`
pub async fn to_wsl_path(windows_path: &str) -> PathBuf {
    if let Some(path) = rewrite_to_wsl(windows_path) {
        return path;
    }
    wslpath("-u", windows_path)
        .await
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(windows_path))
}

async fn wslpath(flag: &str, path: &str) -> Option<String> {
    let output = Command::new("wslpath")
        .arg(flag)
        .arg(path)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(WSLPATH_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => {
            let translated = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!translated.is_empty()).then_some(translated)
        }
        Ok(Ok(output)) => {
            warn!("wslpath {} {} exited with {}", flag, path, output.status);
            None
        }
        Ok(Err(e)) => {
            warn!("Failed to run wslpath: {}", e);
            None
        }
        Err(_) => {
            warn!("wslpath {} {} timed out", flag, path);
            None
        }
    }
}
