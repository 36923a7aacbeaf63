//! Image file placement and writing

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::naming::sanitize::split_extension;

/// Image save errors
#[derive(Debug, Error)]
pub enum SaveError {
    /// The disk is full
    #[error("No space left on device")]
    OutOfSpace,

    /// The image directory is not writable
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other IO error
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SaveError {
    fn from(e: io::Error) -> Self {
        if is_out_of_space(&e) {
            SaveError::OutOfSpace
        } else if e.kind() == io::ErrorKind::PermissionDenied {
            SaveError::PermissionDenied(e.to_string())
        } else {
            SaveError::Io(e)
        }
    }
}

#[cfg(unix)]
fn is_out_of_space(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENOSPC)
}

#[cfg(windows)]
fn is_out_of_space(e: &io::Error) -> bool {
    // ERROR_DISK_FULL, ERROR_HANDLE_DISK_FULL
    matches!(e.raw_os_error(), Some(112) | Some(39))
}

#[cfg(not(any(unix, windows)))]
fn is_out_of_space(_e: &io::Error) -> bool {
    false
}

/// Where an image should be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    /// Absolute image directory
    pub directory: PathBuf,
    /// Preferred file name; a suffix is added when it is taken
    pub file_name: String,
}

impl SaveTarget {
    /// Place `file_name` in `image_dir`, which is either absolute or
    /// relative to the document's directory
    pub fn resolve(document: &Path, image_dir: &Path, file_name: &str) -> Self {
        let directory = if image_dir.is_absolute() {
            normalize(image_dir)
        } else {
            normalize(&document_dir(document).join(image_dir))
        };

        Self {
            directory,
            file_name: file_name.to_string(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// A successfully written image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub file_name: String,
}

impl SavedImage {
    /// File name without its extension
    pub fn stem(&self) -> &str {
        split_extension(&self.file_name)
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}

/// Absolute directory containing `document`
pub fn document_dir(document: &Path) -> PathBuf {
    let document = absolute(document);
    document
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(document)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

/// Remove `.` and resolve `..` without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `stem-n.ext`, shortened so it stays within `max_length` characters
pub fn disambiguated_name(file_name: &str, n: u32, max_length: usize) -> String {
    let (stem, suffix) = match split_extension(file_name) {
        Some((stem, ext)) => (stem, format!("-{}.{}", n, ext)),
        None => (file_name, format!("-{}", n)),
    };

    let keep = max_length.saturating_sub(suffix.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    format!("{}{}", stem, suffix)
}

/// First free name in `directory`, starting at suffix `start` (0 = unsuffixed).
///
/// Returns the name and the suffix it used.
pub async fn ensure_unique_path(
    directory: &Path,
    file_name: &str,
    start: u32,
    max_length: usize,
) -> (String, u32) {
    let mut counter = start;
    loop {
        let candidate = if counter == 0 {
            file_name.to_string()
        } else {
            disambiguated_name(file_name, counter, max_length)
        };

        let taken = tokio::fs::try_exists(directory.join(&candidate))
            .await
            .unwrap_or(false);
        if !taken {
            return (candidate, counter);
        }
        counter += 1;
    }
}

/// Write `bytes` under `target` without ever overwriting an existing file.
///
/// The directory is created when missing. A name that was free when probed
/// but exists at creation time is treated as a duplicate and the next
/// suffix is tried.
pub async fn save_image(
    target: &SaveTarget,
    bytes: &[u8],
    max_length: usize,
) -> Result<SavedImage, SaveError> {
    tokio::fs::create_dir_all(&target.directory).await?;

    let mut start = 0;
    loop {
        let (file_name, used) =
            ensure_unique_path(&target.directory, &target.file_name, start, max_length).await;
        let path = target.directory.join(&file_name);

        match write_new(&path, bytes).await {
            Ok(()) => {
                debug!("Saved {} bytes to {}", bytes.len(), path.display());
                return Ok(SavedImage { path, file_name });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} appeared while saving, trying next name", path.display());
                start = used + 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        remove_file_best_effort(path).await;
        return Err(e);
    }
    Ok(())
}

/// Delete `path`, logging failures
pub async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => warn!("Failed to delete file {}: {}", path.display(), e),
    }
}

/// Path of `target` as written in the document.
///
/// Relative to `document_dir` with forward slashes, prefixed with `./`
/// unless it climbs with `..`. Falls back to the absolute path when no
/// relative path exists, as across Windows drives.
pub fn relative_reference(document_dir: &Path, target: &Path) -> String {
    match relative_path(document_dir, target) {
        Some(relative) => {
            let relative = forward_slashes(&relative);
            if relative == ".." || relative.starts_with("../") {
                relative
            } else {
                format!("./{}", relative)
            }
        }
        None => forward_slashes(target),
    }
}

fn relative_path(from_dir: &Path, to: &Path) -> Option<PathBuf> {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = to.components().collect();

    if from.first() != to.first() {
        return None;
    }

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    Some(relative)
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Markdown image reference.
///
/// Line breaks in `alt` become spaces and `]` is escaped so the reference
/// stays on one line and keeps its brackets balanced.
pub fn markdown_image(alt: &str, path: &str) -> String {
    let alt = alt
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace(']', "\\]");
    format!("![{}]({})", alt, path.replace('\\', "/"))
}
