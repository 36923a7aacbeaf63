//! Document editing surface
//!
//! The paste pipeline only needs a handful of things from the document it
//! edits. [`MarkdownFile`] provides them for a Markdown file on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File extensions treated as Markdown
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd", "mdx"];

/// Editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// There is no selection to replace
    #[error("No selection to replace")]
    NoSelection,

    /// The selected text no longer occurs in the document
    #[error("Selection not found in document: {0}")]
    SelectionNotFound(String),

    /// The editor refused the edit
    #[error("Edit rejected: {0}")]
    Rejected(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The document a paste targets
#[async_trait]
pub trait Editor: Send + Sync {
    /// Whether pasting images makes sense for this document
    fn is_target_document(&self) -> bool;

    /// Non-empty selected text at invocation time
    fn selection_text(&self) -> Option<String>;

    /// Location of the document on disk
    fn document_path(&self) -> Option<PathBuf>;

    /// Replace the selection with `text`
    async fn replace_selection(&self, text: &str) -> Result<(), EditorError>;

    /// Insert `text` at the cursor
    async fn insert_at_cursor(&self, text: &str) -> Result<(), EditorError>;
}

/// A Markdown file on disk.
///
/// The selection is text that must occur in the file; its first occurrence
/// is replaced. The cursor is a line number: text is inserted on a new line
/// after it, or appended at the end of the file when no line is given.
#[derive(Debug, Clone)]
pub struct MarkdownFile {
    path: PathBuf,
    selection: Option<String>,
    cursor_line: Option<usize>,
}

impl MarkdownFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            selection: None,
            cursor_line: None,
        }
    }

    pub fn with_selection(mut self, selection: Option<String>) -> Self {
        self.selection = selection.filter(|text| !text.is_empty());
        self
    }

    pub fn with_cursor_line(mut self, line: Option<usize>) -> Self {
        self.cursor_line = line;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<String, EditorError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `path` has a Markdown extension
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Insert `text` as a new line after line `line` (1-based), or at the end
pub fn insert_after_line(contents: &str, line: Option<usize>, text: &str) -> String {
    let mut lines: Vec<&str> = contents.split_inclusive('\n').collect();
    let at = line.unwrap_or(lines.len()).min(lines.len());

    let separator = if at > 0 && !lines[at - 1].ends_with('\n') {
        "\n"
    } else {
        ""
    };
    let inserted = format!("{}{}\n", separator, text);

    let mut result = lines.drain(..at).collect::<String>();
    result.push_str(&inserted);
    result.extend(lines);
    result
}

#[async_trait]
impl Editor for MarkdownFile {
    fn is_target_document(&self) -> bool {
        is_markdown_path(&self.path)
    }

    fn selection_text(&self) -> Option<String> {
        self.selection.clone()
    }

    fn document_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    async fn replace_selection(&self, text: &str) -> Result<(), EditorError> {
        let selection = self.selection.as_deref().ok_or(EditorError::NoSelection)?;
        let contents = self.read().await?;

        if !contents.contains(selection) {
            return Err(EditorError::SelectionNotFound(selection.to_string()));
        }

        let updated = contents.replacen(selection, text, 1);
        tokio::fs::write(&self.path, updated).await?;
        debug!("Replaced selection in {}", self.path.display());
        Ok(())
    }

    async fn insert_at_cursor(&self, text: &str) -> Result<(), EditorError> {
        let contents = self.read().await?;
        let updated = insert_after_line(&contents, self.cursor_line, text);
        tokio::fs::write(&self.path, updated).await?;
        debug!(
            line = ?self.cursor_line,
            "Inserted text into {}",
            self.path.display()
        );
        Ok(())
    }
}
