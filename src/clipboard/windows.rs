//! Windows clipboard adapter using a PowerShell helper

use async_trait::async_trait;
use std::time::Duration;

use super::helper::{ExitPolicy, HelperInvocation, HelperOutput, ScriptedClipboard};
use super::{ClipboardError, ClipboardImage, ImageClipboard};

/// Windows clipboard adapter
pub struct WindowsClipboard {
    inner: ScriptedClipboard,
}

impl WindowsClipboard {
    /// `script` must be a path `powershell.exe` can open
    pub fn new(script: String, timeout: Duration) -> Self {
        Self {
            inner: ScriptedClipboard::new("WindowsClipboard", powershell_invocation(script, timeout)),
        }
    }

    /// Run the PowerShell helper and return its raw answer
    pub(crate) async fn query(&self) -> Result<HelperOutput, ClipboardError> {
        self.inner.query().await
    }

    pub(crate) fn scripted(&self) -> &ScriptedClipboard {
        &self.inner
    }
}

fn powershell_invocation(script: String, timeout: Duration) -> HelperInvocation {
    let args = [
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-File",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(script))
    .collect();

    HelperInvocation::new("powershell.exe", args, timeout, ExitPolicy::ZeroOrOne)
}

#[async_trait]
impl ImageClipboard for WindowsClipboard {
    async fn has_image(&self) -> bool {
        self.inner.has_image().await
    }

    async fn get_image(&self) -> Option<ClipboardImage> {
        self.inner.get_image().await
    }

    async fn cleanup(&self) {
        self.inner.cleanup().await
    }

    fn name(&self) -> &str {
        "Windows"
    }
}
