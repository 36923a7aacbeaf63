//! Linux clipboard adapter (X11 via xclip, Wayland via wl-paste)

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::helper::{ExitPolicy, HelperInvocation, ScriptedClipboard};
use super::{ClipboardImage, ImageClipboard};

/// Linux clipboard adapter driven by a bash helper script
pub struct LinuxClipboard {
    inner: ScriptedClipboard,
}

impl LinuxClipboard {
    pub fn new(script: PathBuf, timeout: Duration) -> Self {
        let invocation = HelperInvocation::new(
            "bash",
            vec![script.display().to_string()],
            timeout,
            ExitPolicy::ZeroOrOne,
        );
        Self {
            inner: ScriptedClipboard::new("LinuxClipboard", invocation),
        }
    }

    /// Number of temp files awaiting cleanup
    pub fn pending_temp_files(&self) -> usize {
        self.inner.temp_files().len()
    }
}

#[async_trait]
impl ImageClipboard for LinuxClipboard {
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
        "Linux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_runs_script_with_bash() {
        let clipboard = LinuxClipboard::new(
            PathBuf::from("/tmp/linux-clipboard.sh"),
            Duration::from_secs(5),
        );
        let invocation = clipboard.inner.invocation();
        assert_eq!(invocation.program(), "bash");
        assert_eq!(invocation.args(), ["/tmp/linux-clipboard.sh".to_string()]);
        assert_eq!(clipboard.pending_temp_files(), 0);
    }
}
