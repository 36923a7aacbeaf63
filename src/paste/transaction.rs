//! Save-then-edit transaction
//!
//! Tracks whether the image file was written and whether the document edit
//! went through, so that a failed edit leaves no orphaned file behind.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::files::{self, SaveError, SaveTarget, SavedImage};

/// Transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing written yet
    Pending,
    /// Image file exists, document not yet edited
    Written,
    /// Document edited; the file stays
    Committed,
    /// Document edit failed; the file was deleted
    RolledBack,
}

/// One image write paired with one document edit.
///
/// Dropping a transaction that is still `Written` deletes the file.
#[derive(Debug)]
pub struct PasteTransaction {
    state: TransactionState,
    written: Option<PathBuf>,
}

impl PasteTransaction {
    pub fn new() -> Self {
        Self {
            state: TransactionState::Pending,
            written: None,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Path of the written image, while one exists
    pub fn written_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    /// Save the image. A failed save leaves the transaction `Pending`.
    pub async fn write(
        &mut self,
        target: &SaveTarget,
        bytes: &[u8],
        max_file_name_length: usize,
    ) -> Result<SavedImage, SaveError> {
        if self.state != TransactionState::Pending {
            return Err(SaveError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("cannot write in state {:?}", self.state),
            )));
        }

        let saved = files::save_image(target, bytes, max_file_name_length).await?;
        self.written = Some(saved.path.clone());
        self.state = TransactionState::Written;
        Ok(saved)
    }

    /// Keep the written file
    pub fn commit(&mut self) {
        if self.state == TransactionState::Written {
            self.state = TransactionState::Committed;
            self.written = None;
        } else {
            warn!("Ignoring commit in state {:?}", self.state);
        }
    }

    /// Delete the written file, best-effort
    pub async fn rollback(&mut self) {
        if self.state != TransactionState::Written {
            warn!("Ignoring rollback in state {:?}", self.state);
            return;
        }

        if let Some(path) = self.written.take() {
            debug!("Rolling back {}", path.display());
            files::remove_file_best_effort(&path).await;
        }
        self.state = TransactionState::RolledBack;
    }
}

impl Default for PasteTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PasteTransaction {
    fn drop(&mut self) {
        if let Some(path) = self.written.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to delete file {}: {}", path.display(), e);
            }
        }
    }
}
