//! User-facing notifications
//!
//! Every paste ends with exactly one success, warning, or error
//! notification. Progress lines may precede it while slow steps run.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

/// Notification texts shown to the user
pub mod messages {
    use std::fmt::Display;

    pub const NOT_MARKDOWN_FILE: &str = "Please use this feature in Markdown files";
    pub const NO_IMAGE_IN_CLIPBOARD: &str = "No image found in clipboard";
    pub const NO_DOCUMENT_PATH: &str = "Unable to get current document path";
    pub const FAILED_TO_SAVE_IMAGE: &str = "Failed to save image";
    pub const FAILED_TO_INSERT_IMAGE: &str = "Failed to insert image reference";
    pub const FAILED_TO_PASTE_IMAGE: &str = "Failed to paste image";
    pub const IMAGE_TOO_LARGE: &str = "Image is too large";

    pub const IMAGE_SAVED: &str = "Image saved";

    pub const GENERATING_FILENAME: &str = "Generating filename";
    pub const ANALYZING_IMAGE: &str = "Analyzing image";
    pub const FILENAME_GENERATED: &str = "Filename generated";
    pub const USING_FALLBACK_NAMING: &str = "Using fallback naming";

    /// `"<message>: <error>"`
    pub fn format_error(message: &str, error: impl Display) -> String {
        format!("{}: {}", message, error)
    }

    /// `"<message>: <detail>"`, or the bare message
    pub fn format_info(message: &str, detail: Option<&str>) -> String {
        match detail {
            Some(detail) => format!("{}: {}", message, detail),
            None => message.to_string(),
        }
    }
}

/// Receiver of user-facing notifications
pub trait Notifier: Send + Sync {
    fn progress(&self, message: &str);
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Prints notifications to the terminal with elapsed time
pub struct ConsoleNotifier {
    start_time: Instant,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    fn elapsed(&self) -> f32 {
        self.start_time.elapsed().as_secs_f32()
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn progress(&self, message: &str) {
        print!("{}... ", message);
        io::stdout().flush().unwrap_or(());
    }

    fn success(&self, message: &str) {
        println!("\r✅ {} ({:.1}s)", message, self.elapsed());
    }

    fn warning(&self, message: &str) {
        println!("\r⚠️  {} ({:.1}s)", message, self.elapsed());
    }

    fn error(&self, message: &str) {
        eprintln!("\r❌ {} ({:.1}s)", message, self.elapsed());
    }
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Progress,
    Success,
    Warning,
    Error,
}

/// Keeps notifications in memory, for embedding and tests
#[derive(Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Notifications other than progress lines
    pub fn outcomes(&self) -> Vec<(Level, String)> {
        self.entries()
            .into_iter()
            .filter(|(level, _)| *level != Level::Progress)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

impl Notifier for RecordingNotifier {
    fn progress(&self, message: &str) {
        self.push(Level::Progress, message);
    }

    fn success(&self, message: &str) {
        self.push(Level::Success, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formatting() {
        assert_eq!(
            messages::format_error(messages::FAILED_TO_SAVE_IMAGE, "disk full"),
            "Failed to save image: disk full"
        );
        assert_eq!(
            messages::format_info(messages::IMAGE_SAVED, Some("./shot.png")),
            "Image saved: ./shot.png"
        );
        assert_eq!(messages::format_info(messages::IMAGE_SAVED, None), "Image saved");
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.progress(messages::GENERATING_FILENAME);
        notifier.warning(messages::NO_IMAGE_IN_CLIPBOARD);

        assert_eq!(notifier.entries().len(), 2);
        assert_eq!(
            notifier.outcomes(),
            vec![(Level::Warning, messages::NO_IMAGE_IN_CLIPBOARD.to_string())]
        );
    }

    #[test]
    fn test_console_notifier() {
        let notifier = ConsoleNotifier::new();
        notifier.progress(messages::GENERATING_FILENAME);
        notifier.success(messages::IMAGE_SAVED);
        notifier.warning(messages::NO_IMAGE_IN_CLIPBOARD);
        notifier.error(messages::FAILED_TO_PASTE_IMAGE);
    }
}
