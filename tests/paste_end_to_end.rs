//! End-to-end paste tests
//!
//! Each test runs the full paste pipeline against a Markdown file in a temp
//! directory, with a fake clipboard and, where needed, a mock naming service.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use regex::Regex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pastemark::clipboard::{ClipboardImage, ImageClipboard};
use pastemark::editor::{Editor, EditorError, MarkdownFile};
use pastemark::naming::{NameSuggester, NamingEngine, NamingSource, RemoteNamingClient};
use pastemark::notify::{Level, RecordingNotifier};
use pastemark::paste::{PasteCommand, PasteError};

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

struct StaticClipboard(Vec<u8>);

#[async_trait]
impl ImageClipboard for StaticClipboard {
    async fn has_image(&self) -> bool {
        true
    }

    async fn get_image(&self) -> Option<ClipboardImage> {
        Some(ClipboardImage::from_bytes(self.0.clone()))
    }

    async fn cleanup(&self) {}

    fn name(&self) -> &str {
        "Static"
    }
}

/// Editor whose edits always fail
struct RejectingEditor {
    path: std::path::PathBuf,
}

#[async_trait]
impl Editor for RejectingEditor {
    fn is_target_document(&self) -> bool {
        true
    }

    fn selection_text(&self) -> Option<String> {
        None
    }

    fn document_path(&self) -> Option<std::path::PathBuf> {
        Some(self.path.clone())
    }

    async fn replace_selection(&self, _text: &str) -> Result<(), EditorError> {
        Err(EditorError::Rejected("document is read-only".to_string()))
    }

    async fn insert_at_cursor(&self, _text: &str) -> Result<(), EditorError> {
        Err(EditorError::Rejected("document is read-only".to_string()))
    }
}

fn clipboard() -> Arc<StaticClipboard> {
    Arc::new(StaticClipboard(PNG.to_vec()))
}

fn remote_engine(server: &MockServer) -> NamingEngine {
    let client = RemoteNamingClient::new(server.uri(), "llava", "name this image")
        .unwrap()
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));
    let suggester: Arc<dyn NameSuggester> = Arc::new(client);
    NamingEngine::new(Some(suggester), 255)
}

fn image_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_explicit_selection_names_and_replaces() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("notes.md");
    std::fs::write(&doc, "Intro\n\nmy shot\n\nOutro\n").unwrap();

    let editor = Arc::new(MarkdownFile::new(&doc).with_selection(Some("my shot".to_string())));
    let notifier = Arc::new(RecordingNotifier::new());

    let report = PasteCommand::new(clipboard(), editor, notifier.clone(), NamingEngine::local(255))
        .execute(false)
        .await
        .unwrap();

    assert_eq!(report.file_name, "my-shot.png");
    assert_eq!(report.source, NamingSource::Explicit);
    assert!(report.replaced_selection);
    assert_eq!(report.reference, "![my shot](./my-shot.png)");

    assert_eq!(std::fs::read(dir.path().join("my-shot.png")).unwrap(), PNG);
    assert_eq!(
        std::fs::read_to_string(&doc).unwrap(),
        "Intro\n\n![my shot](./my-shot.png)\n\nOutro\n"
    );
    assert_eq!(
        notifier.outcomes(),
        vec![(Level::Success, "Image saved: my-shot.png".to_string())]
    );
}

#[tokio::test]
async fn test_unavailable_service_falls_back_to_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("notes.md");
    let editor = Arc::new(MarkdownFile::new(&doc));
    let notifier = Arc::new(RecordingNotifier::new());

    let report = PasteCommand::new(clipboard(), editor, notifier, remote_engine(&server))
        .execute(true)
        .await
        .unwrap();

    assert_eq!(report.source, NamingSource::Timestamp);
    let pattern = Regex::new(r"^image-\d{8}-\d{6}\.png$").unwrap();
    assert!(pattern.is_match(&report.file_name), "{}", report.file_name);
    assert!(dir.path().join(&report.file_name).exists());

    let contents = std::fs::read_to_string(&doc).unwrap();
    assert!(contents.contains(&format!("(./{})", report.file_name)));
}

#[tokio::test]
async fn test_remote_suggestion_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "Architecture Diagram!!",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("design.md");
    std::fs::write(&doc, "# Design\n").unwrap();
    let editor = Arc::new(MarkdownFile::new(&doc));

    let report = PasteCommand::new(
        clipboard(),
        editor,
        Arc::new(RecordingNotifier::new()),
        remote_engine(&server),
    )
    .execute(true)
    .await
    .unwrap();

    assert_eq!(report.source, NamingSource::Remote);
    assert_eq!(report.file_name, "architecture-diagram.png");
    assert!(dir.path().join("architecture-diagram.png").exists());
    assert_eq!(
        std::fs::read_to_string(&doc).unwrap(),
        "# Design\n![architecture-diagram](./architecture-diagram.png)\n"
    );
}

#[tokio::test]
async fn test_existing_name_gets_numeric_suffix() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("notes.md");
    std::fs::write(&doc, "shot\n").unwrap();
    std::fs::write(dir.path().join("shot.png"), b"original").unwrap();

    let editor = Arc::new(MarkdownFile::new(&doc).with_selection(Some("shot".to_string())));
    let report = PasteCommand::new(
        clipboard(),
        editor,
        Arc::new(RecordingNotifier::new()),
        NamingEngine::local(255),
    )
    .execute(false)
    .await
    .unwrap();

    assert_eq!(report.file_name, "shot-1.png");
    assert_eq!(std::fs::read(dir.path().join("shot.png")).unwrap(), b"original");
    assert_eq!(std::fs::read(dir.path().join("shot-1.png")).unwrap(), PNG);
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), "![shot](./shot-1.png)\n");
}

#[tokio::test]
async fn test_repeated_paste_keeps_both_files() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("notes.md");

    for _ in 0..2 {
        let editor = Arc::new(MarkdownFile::new(&doc));
        PasteCommand::new(
            clipboard(),
            editor,
            Arc::new(RecordingNotifier::new()),
            NamingEngine::local(255),
        )
        .with_image_dir("img")
        .execute(false)
        .await
        .unwrap();
    }

    // Both pastes usually land in the same second and share a timestamp name
    assert_eq!(image_files(&dir.path().join("img")).len(), 2);
}

#[tokio::test]
async fn test_failed_insert_removes_saved_image() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("notes.md");
    let editor = Arc::new(RejectingEditor { path: doc.clone() });
    let notifier = Arc::new(RecordingNotifier::new());

    let result = PasteCommand::new(clipboard(), editor, notifier.clone(), NamingEngine::local(255))
        .execute(false)
        .await;

    assert!(matches!(result, Err(PasteError::Insert(_))));
    assert!(image_files(dir.path()).is_empty());
    assert!(!doc.exists());

    let outcomes = notifier.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, Level::Error);
}
