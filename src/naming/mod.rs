//! Image file naming
//!
//! The base name comes from the first source that produces one:
//! 1. explicit text selected by the user
//! 2. a suggestion from the remote naming service, when allowed
//! 3. a local timestamp
//!
//! Remote failures never escape this module; they are logged and the
//! timestamp is used instead.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardImage;
use crate::sniff::ImageFormat;

pub mod remote;
pub mod sanitize;

pub use remote::RemoteNamingClient;
pub use sanitize::{sanitize_file_name, timestamp_file_name, truncate_file_name};

/// Remote naming errors
#[derive(Debug, Error)]
pub enum NamingError {
    /// The service did not answer in time
    #[error("Naming request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure or non-2xx status
    #[error("Naming service error: {0}")]
    Upstream(String),

    /// The answer held no usable name
    #[error("Invalid naming response: {0}")]
    InvalidResponse(String),
}

/// Something that can propose a name for an image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NameSuggester: Send + Sync {
    /// Whether suggestions can be requested right now
    async fn is_available(&self) -> bool;

    /// Propose a base file name for the encoded image
    async fn suggest_name(&self, image: &[u8]) -> Result<String, NamingError>;
}

/// Input to [`NamingEngine::resolve`]
#[derive(Debug, Clone)]
pub struct NamingRequest {
    pub explicit_text: Option<String>,
    pub allow_remote_naming: bool,
    pub image: ClipboardImage,
}

/// Where a base name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingSource {
    Explicit,
    Remote,
    Timestamp,
}

impl NamingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingSource::Explicit => "explicit",
            NamingSource::Remote => "remote",
            NamingSource::Timestamp => "timestamp",
        }
    }
}

/// Chosen base name, without extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOutcome {
    pub base_name: String,
    pub source: NamingSource,
}

/// Picks file names for pasted images
#[derive(Clone)]
pub struct NamingEngine {
    suggester: Option<Arc<dyn NameSuggester>>,
    max_file_name_length: usize,
}

impl NamingEngine {
    pub fn new(suggester: Option<Arc<dyn NameSuggester>>, max_file_name_length: usize) -> Self {
        Self {
            suggester,
            max_file_name_length,
        }
    }

    /// Engine that only ever uses explicit text or timestamps
    pub fn local(max_file_name_length: usize) -> Self {
        Self::new(None, max_file_name_length)
    }

    pub fn max_file_name_length(&self) -> usize {
        self.max_file_name_length
    }

    pub fn has_suggester(&self) -> bool {
        self.suggester.is_some()
    }

    /// Choose the base name for `request`
    pub async fn resolve(&self, request: &NamingRequest) -> NamingOutcome {
        if let Some(text) = request
            .explicit_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            let base_name = sanitize_file_name(text);
            debug!("Using explicit name: {}", base_name);
            return NamingOutcome {
                base_name,
                source: NamingSource::Explicit,
            };
        }

        if request.allow_remote_naming {
            if let Some(base_name) = self.remote_name(&request.image).await {
                info!("Using suggested name: {}", base_name);
                return NamingOutcome {
                    base_name,
                    source: NamingSource::Remote,
                };
            }
        }

        let base_name = timestamp_file_name();
        debug!("Using timestamp name: {}", base_name);
        NamingOutcome {
            base_name,
            source: NamingSource::Timestamp,
        }
    }

    /// Full file name for `outcome`, shortened to the configured maximum
    pub fn file_name(&self, outcome: &NamingOutcome, format: ImageFormat) -> String {
        let name = format!("{}.{}", outcome.base_name, format.extension());
        truncate_file_name(&name, self.max_file_name_length)
    }

    async fn remote_name(&self, image: &ClipboardImage) -> Option<String> {
        let suggester = self.suggester.as_ref()?;

        if !suggester.is_available().await {
            debug!("Naming service unavailable, using fallback naming");
            return None;
        }

        match suggester.suggest_name(&image.bytes).await {
            Ok(name) => Some(sanitize_file_name(&name)),
            Err(e) => {
                warn!("Failed to generate name: {}", e);
                None
            }
        }
    }
}
