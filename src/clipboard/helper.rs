//! Helper process plumbing shared by the platform adapters
//!
//! Every adapter runs a small script that answers on stdout with one of:
//! an absolute temp file path, `no image`, or `error:<detail>`. This module
//! runs that script under a hard timeout, parses the answer, and keeps track
//! of temp files so they can be removed afterwards.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ClipboardError, ClipboardImage};

const LINUX_SCRIPT: &str = include_str!("../../resources/linux-clipboard.sh");
const MACOS_SCRIPT: &str = include_str!("../../resources/mac-clipboard.applescript");
const WINDOWS_SCRIPT: &str = include_str!("../../resources/windows-clipboard.ps1");

/// Sentinel printed by helpers when the clipboard holds no image
pub const NO_IMAGE: &str = "no image";

/// Prefix printed by helpers on internal failure
pub const ERROR_PREFIX: &str = "error:";

/// Helper scripts bundled with the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperScript {
    Linux,
    MacOS,
    Windows,
}

impl HelperScript {
    pub fn file_name(self) -> &'static str {
        match self {
            HelperScript::Linux => "linux-clipboard.sh",
            HelperScript::MacOS => "mac-clipboard.applescript",
            HelperScript::Windows => "windows-clipboard.ps1",
        }
    }

    pub fn contents(self) -> &'static str {
        match self {
            HelperScript::Linux => LINUX_SCRIPT,
            HelperScript::MacOS => MACOS_SCRIPT,
            HelperScript::Windows => WINDOWS_SCRIPT,
        }
    }

    /// Find the script on disk.
    ///
    /// A copy in `script_dir` takes precedence. Otherwise the embedded script
    /// is written to a versioned directory under the system temp directory,
    /// and rewritten whenever its contents differ from the embedded copy.
    pub async fn locate(self, script_dir: Option<&Path>) -> Result<PathBuf, ClipboardError> {
        if let Some(dir) = script_dir {
            let candidate = dir.join(self.file_name());
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
            warn!(
                "Helper script {} not found in {}, using bundled copy",
                self.file_name(),
                dir.display()
            );
        }

        let dir = std::env::temp_dir().join(format!("pastemark-scripts-{}", crate::VERSION));
        self.materialize(&dir).await
    }

    /// Write the embedded script into `dir` unless an identical copy exists
    pub async fn materialize(self, dir: &Path) -> Result<PathBuf, ClipboardError> {
        let path = dir.join(self.file_name());

        match tokio::fs::read_to_string(&path).await {
            Ok(existing) if existing == self.contents() => return Ok(path),
            _ => {}
        }

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, self.contents()).await?;
        debug!("Materialized helper script at {}", path.display());
        Ok(path)
    }
}

/// How a helper's exit status is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Exit codes 0 and 1 both carry an answer on stdout; others are failures
    ZeroOrOne,
    /// Any non-zero exit means the clipboard holds no image
    NonZeroIsNoImage,
}

/// Parsed helper answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperOutput {
    /// Path of the temp file holding the image, in the helper's path syntax
    ImagePath(String),
    NoImage,
    /// Helper reported `error:<detail>`
    Failed(String),
}

impl HelperOutput {
    pub fn parse(stdout: &str) -> Self {
        let answer = stdout.trim();
        if answer.is_empty() || answer == NO_IMAGE {
            HelperOutput::NoImage
        } else if let Some(detail) = answer.strip_prefix(ERROR_PREFIX) {
            HelperOutput::Failed(detail.trim().to_string())
        } else {
            HelperOutput::ImagePath(answer.to_string())
        }
    }
}

/// A helper command line plus its timeout and exit policy
#[derive(Debug, Clone)]
pub struct HelperInvocation {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    exit_policy: ExitPolicy,
}

impl HelperInvocation {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        exit_policy: ExitPolicy,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            exit_policy,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the helper and parse its answer.
    ///
    /// On timeout the child is killed, and the kill is awaited, before
    /// `ClipboardError::Timeout` is returned.
    pub async fn run(&self) -> Result<HelperOutput, ClipboardError> {
        debug!(program = %self.program, args = ?self.args, "Running clipboard helper");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", self.program, e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(ClipboardError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        // A grandchild may still hold the pipes open after the helper exits
        let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];
        let pipes = async {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            (stdout, stderr)
        };
        let (stdout, stderr) = match tokio::time::timeout(self.timeout, pipes).await {
            Ok(output) => output,
            Err(_) => {
                warn!("{} exited but its output pipes stayed open", self.program);
                readers.iter().for_each(|reader| reader.abort());
                return Err(ClipboardError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let accepted = match (self.exit_policy, status.code()) {
            (_, Some(0)) => true,
            (ExitPolicy::ZeroOrOne, Some(1)) => true,
            (ExitPolicy::NonZeroIsNoImage, _) => {
                debug!(
                    "{} exited with {}, treating as no image: {}",
                    self.program,
                    status,
                    stderr.trim()
                );
                return Ok(HelperOutput::NoImage);
            }
            _ => false,
        };

        if !accepted {
            return Err(ClipboardError::HelperFailed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let output = HelperOutput::parse(&stdout);
        debug!(program = %self.program, ?output, "Clipboard helper answered");
        Ok(output)
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Failed to read helper pipe: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Temp files created by a helper during an adapter's lifetime.
///
/// Drained by [`TempFiles::cleanup`]; whatever is left when the registry is
/// dropped is removed synchronously.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Mutex<Vec<PathBuf>>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: PathBuf) {
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.paths.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Delete every registered file; failures are logged
    pub async fn cleanup(&self) {
        for path in self.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Cleaned up temp file: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to clean up temp file {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to clean up temp file {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Core shared by the script-driven adapters
#[derive(Debug)]
pub struct ScriptedClipboard {
    name: &'static str,
    invocation: HelperInvocation,
    temp_files: TempFiles,
}

impl ScriptedClipboard {
    pub fn new(name: &'static str, invocation: HelperInvocation) -> Self {
        Self {
            name,
            invocation,
            temp_files: TempFiles::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invocation(&self) -> &HelperInvocation {
        &self.invocation
    }

    pub fn temp_files(&self) -> &TempFiles {
        &self.temp_files
    }

    pub async fn query(&self) -> Result<HelperOutput, ClipboardError> {
        self.invocation.run().await
    }

    /// Interpret a helper answer as image presence, logging failures.
    ///
    /// The helper already wrote the image to answer, so its temp file is
    /// registered for cleanup even though it is not read here.
    pub fn answer_has_image(&self, answer: Result<HelperOutput, ClipboardError>) -> bool {
        match answer {
            Ok(HelperOutput::ImagePath(path)) => {
                self.temp_files.register(PathBuf::from(path));
                true
            }
            Ok(HelperOutput::NoImage) => false,
            Ok(HelperOutput::Failed(detail)) => {
                warn!("[{}] Clipboard helper error: {}", self.name, detail);
                false
            }
            Err(e) => {
                warn!("[{}] Failed to check clipboard: {}", self.name, e);
                false
            }
        }
    }

    /// Load the image a helper answered with, logging failures
    pub async fn answer_image(
        &self,
        answer: Result<HelperOutput, ClipboardError>,
    ) -> Option<ClipboardImage> {
        let path = match answer {
            Ok(HelperOutput::ImagePath(path)) => PathBuf::from(path),
            Ok(HelperOutput::NoImage) => {
                debug!("[{}] No image in clipboard", self.name);
                return None;
            }
            Ok(HelperOutput::Failed(detail)) => {
                warn!("[{}] Clipboard helper error: {}", self.name, detail);
                return None;
            }
            Err(e) => {
                warn!("[{}] Failed to get image from clipboard: {}", self.name, e);
                return None;
            }
        };

        match self.load(&path).await {
            Ok(image) => {
                debug!(
                    "[{}] Read image: {} bytes, format: {}",
                    self.name,
                    image.len(),
                    image.format
                );
                Some(image)
            }
            Err(e) => {
                warn!("[{}] {}", self.name, e);
                None
            }
        }
    }

    /// Register `path` for cleanup and read it fully into memory
    pub async fn load(&self, path: &Path) -> Result<ClipboardImage, ClipboardError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ClipboardError::TempFileMissing(path.to_path_buf()));
        }

        self.temp_files.register(path.to_path_buf());
        let bytes = tokio::fs::read(path).await?;
        Ok(ClipboardImage::from_bytes(bytes))
    }

    pub async fn has_image(&self) -> bool {
        let answer = self.query().await;
        self.answer_has_image(answer)
    }

    pub async fn get_image(&self) -> Option<ClipboardImage> {
        let answer = self.query().await;
        self.answer_image(answer).await
    }

    pub async fn cleanup(&self) {
        self.temp_files.cleanup().await
    }
}
