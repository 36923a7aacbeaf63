//! Paste pipeline
//!
//! One invocation reads the clipboard image, picks a file name, saves the
//! file next to the document, and inserts a Markdown reference to it. If the
//! insertion fails the saved file is deleted again. Clipboard temp files are
//! cleaned up after every invocation, and exactly one outcome notification
//! is sent.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clipboard::ImageClipboard;
use crate::editor::{Editor, EditorError};
use crate::naming::{NamingEngine, NamingRequest, NamingSource};
use crate::notify::{messages, Notifier};

pub mod files;
pub mod transaction;

pub use files::{SaveError, SaveTarget, SavedImage};
pub use transaction::{PasteTransaction, TransactionState};

/// Paste errors
#[derive(Debug, Error)]
pub enum PasteError {
    /// The document does not accept pasted images
    #[error("{}", messages::NOT_MARKDOWN_FILE)]
    NotTargetDocument,

    /// The document has no location on disk
    #[error("{}", messages::NO_DOCUMENT_PATH)]
    NoDocumentPath,

    /// No readable image on the clipboard
    #[error("{}", messages::NO_IMAGE_IN_CLIPBOARD)]
    ClipboardEmpty,

    /// The image exceeds the configured size limit
    #[error("{msg}: {size} bytes exceeds the limit of {max} bytes", msg = messages::IMAGE_TOO_LARGE)]
    ImageTooLarge { size: usize, max: usize },

    /// Writing the image failed
    #[error("{msg}: {0}", msg = messages::FAILED_TO_SAVE_IMAGE)]
    Save(#[from] SaveError),

    /// Editing the document failed; the image was removed again
    #[error("{msg}: {0}", msg = messages::FAILED_TO_INSERT_IMAGE)]
    Insert(#[from] EditorError),
}

impl PasteError {
    /// Whether this outcome is shown as a warning rather than an error
    pub fn is_warning(&self) -> bool {
        matches!(self, PasteError::ClipboardEmpty)
    }
}

/// What a successful paste did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteReport {
    /// Absolute path of the saved image
    pub path: PathBuf,
    /// Saved file name, including any disambiguation suffix
    pub file_name: String,
    /// Markdown text placed in the document
    pub reference: String,
    /// Where the base name came from
    pub source: NamingSource,
    /// Whether a selection was replaced rather than text inserted
    pub replaced_selection: bool,
    /// Image size in bytes
    pub size: usize,
}

/// The paste command and its collaborators
pub struct PasteCommand {
    clipboard: Arc<dyn ImageClipboard>,
    editor: Arc<dyn Editor>,
    notifier: Arc<dyn Notifier>,
    naming: NamingEngine,
    image_dir: PathBuf,
    max_image_size: usize,
}

impl PasteCommand {
    pub fn new(
        clipboard: Arc<dyn ImageClipboard>,
        editor: Arc<dyn Editor>,
        notifier: Arc<dyn Notifier>,
        naming: NamingEngine,
    ) -> Self {
        Self {
            clipboard,
            editor,
            notifier,
            naming,
            image_dir: PathBuf::from("./"),
            max_image_size: crate::MAX_IMAGE_SIZE,
        }
    }

    /// Image directory, absolute or relative to the document's directory
    pub fn with_image_dir(mut self, image_dir: impl Into<PathBuf>) -> Self {
        self.image_dir = image_dir.into();
        self
    }

    pub fn with_max_image_size(mut self, max_image_size: usize) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    /// Run one paste, notify the outcome, and clean up clipboard temp files
    pub async fn execute(&self, allow_remote_naming: bool) -> Result<PasteReport, PasteError> {
        let result = self.run(allow_remote_naming).await;
        self.clipboard.cleanup().await;

        match &result {
            Ok(report) => {
                info!(
                    file = %report.path.display(),
                    source = report.source.as_str(),
                    "Image pasted"
                );
                self.notifier
                    .success(&messages::format_info(messages::IMAGE_SAVED, Some(&report.file_name)));
            }
            Err(e) if e.is_warning() => {
                debug!("Paste skipped: {}", e);
                self.notifier.warning(&e.to_string());
            }
            Err(e) => {
                warn!("Paste failed: {}", e);
                self.notifier.error(&e.to_string());
            }
        }

        result
    }

    async fn run(&self, allow_remote_naming: bool) -> Result<PasteReport, PasteError> {
        if !self.editor.is_target_document() {
            return Err(PasteError::NotTargetDocument);
        }
        let document = self
            .editor
            .document_path()
            .ok_or(PasteError::NoDocumentPath)?;
        let selection = self.editor.selection_text();

        debug!("Checking clipboard via {}", self.clipboard.name());
        if !self.clipboard.has_image().await {
            return Err(PasteError::ClipboardEmpty);
        }
        let image = self
            .clipboard
            .get_image()
            .await
            .ok_or(PasteError::ClipboardEmpty)?;
        debug!("Read image: {} bytes, format: {}", image.len(), image.format);

        if image.len() > self.max_image_size {
            return Err(PasteError::ImageTooLarge {
                size: image.len(),
                max: self.max_image_size,
            });
        }

        self.notifier.progress(messages::GENERATING_FILENAME);
        let asks_remote = allow_remote_naming
            && self.naming.has_suggester()
            && selection.as_deref().map_or(true, |text| text.trim().is_empty());
        if asks_remote {
            self.notifier.progress(messages::ANALYZING_IMAGE);
        }

        let request = NamingRequest {
            explicit_text: selection.clone(),
            allow_remote_naming,
            image: image.clone(),
        };
        let outcome = self.naming.resolve(&request).await;
        if asks_remote && outcome.source != NamingSource::Remote {
            self.notifier.progress(messages::USING_FALLBACK_NAMING);
        }
        let file_name = self.naming.file_name(&outcome, image.format);
        self.notifier
            .progress(&messages::format_info(messages::FILENAME_GENERATED, Some(&file_name)));

        let target = SaveTarget::resolve(&document, &self.image_dir, &file_name);
        let mut transaction = PasteTransaction::new();
        let saved = transaction
            .write(&target, &image.bytes, self.naming.max_file_name_length())
            .await?;

        let path = files::relative_reference(&files::document_dir(&document), &saved.path);
        let alt = selection
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| saved.stem());
        let reference = files::markdown_image(alt, &path);

        let edit = match &selection {
            Some(_) => self.editor.replace_selection(&reference).await,
            None => self.editor.insert_at_cursor(&reference).await,
        };
        if let Err(e) = edit {
            transaction.rollback().await;
            return Err(PasteError::Insert(e));
        }
        transaction.commit();

        Ok(PasteReport {
            path: saved.path.clone(),
            file_name: saved.file_name.clone(),
            reference,
            source: outcome.source,
            replaced_selection: selection.is_some(),
            size: image.len(),
        })
    }
}
