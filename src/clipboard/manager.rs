//! Cross-platform clipboard manager

use async_trait::async_trait;
use tracing::{debug, info};

use super::text::{parse_text_image, SystemTextClipboard, TextClipboard};
use super::{ClipboardError, ClipboardImage, Environment, ImageClipboard, PlatformClipboard};
use crate::config::ClipboardConfig;

/// Reads images through the platform adapter, falling back to image data
/// encoded in the text clipboard.
///
/// The adapter is always asked first: it yields real image bytes (for
/// example from a screenshot tool), while the text path only serves
/// programs that write base64 into the clipboard.
pub struct ClipboardManager<A = PlatformClipboard, T = SystemTextClipboard> {
    adapter: A,
    text: T,
    text_fallback: bool,
}

impl ClipboardManager {
    /// Detect the environment and build its adapter.
    ///
    /// Fails with [`ClipboardError::UnsupportedPlatform`] when no adapter
    /// exists for the running platform.
    pub async fn new(config: &ClipboardConfig) -> Result<Self, ClipboardError> {
        let environment = Environment::detect()?;
        info!("Initializing clipboard manager for {}", environment.display_name());

        let adapter = PlatformClipboard::for_environment(&environment, config).await?;
        Ok(Self::with_parts(adapter, SystemTextClipboard).text_fallback(config.text_fallback))
    }
}

impl<A, T> ClipboardManager<A, T>
where
    A: ImageClipboard,
    T: TextClipboard,
{
    pub fn with_parts(adapter: A, text: T) -> Self {
        Self {
            adapter,
            text,
            text_fallback: true,
        }
    }

    /// Enable or disable the text clipboard fallback
    pub fn text_fallback(mut self, enabled: bool) -> Self {
        self.text_fallback = enabled;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn text_image(&self) -> Option<ClipboardImage> {
        if !self.text_fallback {
            return None;
        }

        match self.text.read_text().await {
            Ok(text) => {
                debug!("Text clipboard length: {}", text.len());
                parse_text_image(&text)
            }
            Err(e) => {
                debug!("Failed to read text clipboard: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl<A, T> ImageClipboard for ClipboardManager<A, T>
where
    A: ImageClipboard,
    T: TextClipboard,
{
    async fn has_image(&self) -> bool {
        if self.adapter.has_image().await {
            return true;
        }

        debug!("Adapter reported no image, checking text clipboard");
        let found = self.text_image().await.is_some();
        if found {
            debug!("Found encoded image in text clipboard");
        }
        found
    }

    async fn get_image(&self) -> Option<ClipboardImage> {
        if let Some(image) = self.adapter.get_image().await {
            return Some(image);
        }

        let image = self.text_image().await;
        if image.is_some() {
            info!("Got image from text clipboard");
        }
        image
    }

    async fn cleanup(&self) {
        self.adapter.cleanup().await
    }

    fn name(&self) -> &str {
        self.adapter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::ImageFormat;
    use base64::Engine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeAdapter {
        image: Option<ClipboardImage>,
        calls: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ImageClipboard for FakeAdapter {
        async fn has_image(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image.is_some()
        }

        async fn get_image(&self) -> Option<ClipboardImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image.clone()
        }

        async fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "Fake"
        }
    }

    struct FakeText {
        text: Result<String, ()>,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TextClipboard for FakeText {
        async fn read_text(&self) -> Result<String, ClipboardError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.text
                .clone()
                .map_err(|_| ClipboardError::Platform("no text".to_string()))
        }
    }

    fn png_text() -> String {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        base64::engine::general_purpose::STANDARD.encode(png)
    }

    #[tokio::test]
    async fn test_adapter_checked_before_text() {
        let reads = Arc::new(AtomicUsize::new(0));
        let manager = ClipboardManager::with_parts(
            FakeAdapter {
                image: Some(ClipboardImage::from_bytes(b"GIF89a..".to_vec())),
                ..Default::default()
            },
            FakeText {
                text: Ok(png_text()),
                reads: reads.clone(),
            },
        );

        assert!(manager.has_image().await);
        let image = manager.get_image().await.unwrap();
        assert_eq!(image.format, ImageFormat::Gif);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_text_fallback_when_adapter_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = ClipboardManager::with_parts(
            FakeAdapter {
                calls: calls.clone(),
                ..Default::default()
            },
            FakeText {
                text: Ok(png_text()),
                reads: Arc::new(AtomicUsize::new(0)),
            },
        );

        assert!(manager.has_image().await);
        assert_eq!(manager.get_image().await.unwrap().format, ImageFormat::Png);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_text_fallback_disabled() {
        let reads = Arc::new(AtomicUsize::new(0));
        let manager = ClipboardManager::with_parts(
            FakeAdapter::default(),
            FakeText {
                text: Ok(png_text()),
                reads: reads.clone(),
            },
        )
        .text_fallback(false);

        assert!(!manager.has_image().await);
        assert!(manager.get_image().await.is_none());
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_text_read_failure_is_no_image() {
        let manager = ClipboardManager::with_parts(
            FakeAdapter::default(),
            FakeText {
                text: Err(()),
                reads: Arc::new(AtomicUsize::new(0)),
            },
        );
        assert!(!manager.has_image().await);
        assert!(manager.get_image().await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_delegates_to_adapter() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let manager = ClipboardManager::with_parts(
            FakeAdapter {
                cleanups: cleanups.clone(),
                ..Default::default()
            },
            FakeText {
                text: Ok(String::new()),
                reads: Arc::new(AtomicUsize::new(0)),
            },
        );
        manager.cleanup().await;
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(manager.name(), "Fake");
    }
}
