//! Configuration management for PasteMark
//!
//! This module handles loading, validating, and managing configuration
//! for clipboard access, image naming, and image storage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error
    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Clipboard configuration
    #[serde(default)]
    pub clipboard: ClipboardConfig,

    /// Image naming configuration
    #[serde(default)]
    pub naming: NamingConfig,

    /// Image storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Clipboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Hard timeout for clipboard helper processes in milliseconds
    #[serde(default = "default_helper_timeout_ms")]
    pub helper_timeout_ms: u64,

    /// Directory holding replacement helper scripts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_dir: Option<PathBuf>,

    /// Accept base64 images found in the text clipboard
    #[serde(default = "default_true")]
    pub text_fallback: bool,
}

impl ClipboardConfig {
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }
}

/// Image naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Ask the image-understanding service for a name
    #[serde(default = "default_true")]
    pub remote_enabled: bool,

    /// Base URL of the image-understanding service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used to describe the image
    #[serde(default = "default_model")]
    pub model: String,

    /// Prompt sent along with the image
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Availability probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Name generation timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long an availability probe result is reused, in seconds
    #[serde(default = "default_availability_cache_secs")]
    pub availability_cache_secs: u64,

    /// Maximum file name length including the extension
    #[serde(default = "default_max_file_name_length")]
    pub max_file_name_length: usize,
}

impl NamingConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn availability_ttl(&self) -> Duration {
        Duration::from_secs(self.availability_cache_secs)
    }
}

/// Image storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Image directory, absolute or relative to the document's directory
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,

    /// Largest image accepted from the clipboard, in bytes
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_helper_timeout_ms() -> u64 {
    5_000
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llava".to_string()
}

pub(crate) fn default_prompt() -> String {
    "Analyze this image and provide a short, descriptive filename (2-4 words, English, \
     use hyphens to separate words, no file extension). For example: \
     \"user-interface-design\" or \"system-architecture\". Only respond with the filename, \
     nothing else."
        .to_string()
}

fn default_probe_timeout_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    3_000
}

fn default_availability_cache_secs() -> u64 {
    60
}

fn default_max_file_name_length() -> usize {
    255
}

fn default_image_path() -> PathBuf {
    PathBuf::from("./")
}

fn default_max_image_size() -> usize {
    crate::MAX_IMAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            helper_timeout_ms: default_helper_timeout_ms(),
            script_dir: None,
            text_fallback: default_true(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            remote_enabled: default_true(),
            endpoint: default_endpoint(),
            model: default_model(),
            prompt: default_prompt(),
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            availability_cache_secs: default_availability_cache_secs(),
            max_file_name_length: default_max_file_name_length(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            max_image_size: default_max_image_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clipboard: ClipboardConfig::default(),
            naming: NamingConfig::default(),
            storage: StorageConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Checks in order:
    /// 1. Path from PASTEMARK_CONFIG environment variable
    /// 2. ~/.config/pastemark/config.toml
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                let mut config = Self::default();
                config.expand_paths();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration with optional custom path
    pub fn load_config(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_str)?;
        config.expand_paths();
        config.validate_config()?;
        Ok(config)
    }

    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pastemark").join("config.toml"))
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PASTEMARK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        Self::default_path().filter(|p| p.exists())
    }

    /// Expand tilde in paths
    fn expand_paths(&mut self) {
        self.storage.image_path = expand_path(&self.storage.image_path);
        if let Some(dir) = &self.clipboard.script_dir {
            self.clipboard.script_dir = Some(expand_path(dir));
        }
    }

    /// Validate configuration values
    fn validate_config(&self) -> Result<(), ConfigError> {
        // Helper timeout range (500ms to 60s)
        if !(500..=60_000).contains(&self.clipboard.helper_timeout_ms) {
            return Err(ConfigError::Validation(
                "helper_timeout_ms must be between 500 and 60000".to_string(),
            ));
        }

        if !(16..=255).contains(&self.naming.max_file_name_length) {
            return Err(ConfigError::Validation(
                "max_file_name_length must be between 16 and 255".to_string(),
            ));
        }

        if self.naming.probe_timeout_ms == 0 || self.naming.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "naming timeouts must be greater than zero".to_string(),
            ));
        }

        if self.naming.remote_enabled {
            let endpoint = self.naming.endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "endpoint must be an http(s) URL, got '{}'",
                    self.naming.endpoint
                )));
            }
            if self.naming.model.trim().is_empty() {
                return Err(ConfigError::Validation("model must not be empty".to_string()));
            }
        }

        // Image size range (1KB to 100MB)
        if self.storage.max_image_size < 1024 {
            return Err(ConfigError::Validation(
                "max_image_size must be at least 1024 bytes (1KB)".to_string(),
            ));
        }
        if self.storage.max_image_size > 104_857_600 {
            return Err(ConfigError::Validation(
                "max_image_size must not exceed 104857600 bytes (100MB)".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "log_level must be one of trace, debug, info, warn, error; got '{}'",
                other
            ))),
        }
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Write the commented example configuration to the default location
    pub fn generate_example_config(force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = Self::default_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not find config directory",
            ))
        })?;
        Self::write_example_config(&config_path, force)?;
        Ok(config_path)
    }

    /// Write the commented example configuration to `path`
    pub fn write_example_config(path: &Path, force: bool) -> Result<(), ConfigError> {
        if !force && path.exists() {
            return Err(ConfigError::Validation(
                "Config file already exists. Use --force to overwrite.".to_string(),
            ));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::generate_example())?;
        Ok(())
    }

    /// Generate example configuration file
    pub fn generate_example() -> String {
        let config = Config::default();

        format!(
            r#"# PasteMark Configuration File
# Location: ~/.config/pastemark/config.toml

# Clipboard settings
[clipboard]
# Kill clipboard helpers after this many milliseconds
helper_timeout_ms = {}
# Directory with replacement helper scripts (optional)
# script_dir = "~/.config/pastemark/scripts"
# Accept base64 images copied as text
text_fallback = {}

# Image naming
[naming]
# Ask a local image-understanding service for a descriptive name
remote_enabled = {}
endpoint = "{}"
model = "{}"
prompt = {:?}
probe_timeout_ms = {}
request_timeout_ms = {}
# Reuse an availability check for this many seconds
availability_cache_secs = {}
# Longest file name, extension included
max_file_name_length = {}

# Image storage
[storage]
# Absolute, or relative to the document's directory
image_path = "{}"
# Largest accepted image in bytes (10MB default)
max_image_size = {}

# Logging level (trace, debug, info, warn, error)
log_level = "{}"
"#,
            config.clipboard.helper_timeout_ms,
            config.clipboard.text_fallback,
            config.naming.remote_enabled,
            config.naming.endpoint,
            config.naming.model,
            config.naming.prompt,
            config.naming.probe_timeout_ms,
            config.naming.request_timeout_ms,
            config.naming.availability_cache_secs,
            config.naming.max_file_name_length,
            config.storage.image_path.display(),
            config.storage.max_image_size,
            config.log_level
        )
    }
}

/// Expand tilde in path
fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(path_str.as_ref());
    PathBuf::from(expanded.into_owned())
}
