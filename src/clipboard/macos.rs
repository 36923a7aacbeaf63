//! macOS clipboard adapter using AppleScript through `osascript`

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::helper::{ExitPolicy, HelperInvocation, ScriptedClipboard};
use super::{ClipboardImage, ImageClipboard};

/// macOS clipboard adapter.
///
/// `osascript` exits non-zero when the pasteboard cannot be coerced to an
/// image, so any failure exit is read as "no image".
pub struct MacOSClipboard {
    inner: ScriptedClipboard,
}

impl MacOSClipboard {
    pub fn new(script: PathBuf, timeout: Duration) -> Self {
        let invocation = HelperInvocation::new(
            "osascript",
            vec![script.display().to_string()],
            timeout,
            ExitPolicy::NonZeroIsNoImage,
        );
        Self {
            inner: ScriptedClipboard::new("MacOSClipboard", invocation),
        }
    }
}

#[async_trait]
impl ImageClipboard for MacOSClipboard {
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
        "macOS"
    }
}
