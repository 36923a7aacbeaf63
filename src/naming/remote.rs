//! Client for a local image-understanding service
//!
//! Speaks the Ollama HTTP API: `GET /api/tags` answers whether the service
//! is up, `POST /api/generate` turns an image into a short description
//! that is cleaned into a file name.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{NameSuggester, NamingError};
use crate::config::NamingConfig;

static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'`]"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9-]").unwrap());
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

/// Last availability probe
#[derive(Debug, Clone, Copy)]
struct AvailabilityCache {
    last_result: bool,
    last_checked: Instant,
}

/// HTTP client for the naming service.
///
/// Availability is cached per instance; concurrent probes may race and
/// the last one to finish wins.
pub struct RemoteNamingClient {
    client: Client,
    endpoint: String,
    model: String,
    prompt: String,
    probe_timeout: Duration,
    request_timeout: Duration,
    cache_ttl: Duration,
    availability: Mutex<Option<AvailabilityCache>>,
}

impl RemoteNamingClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self, NamingError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(1))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| NamingError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!(endpoint = %endpoint, model = %model, "Creating remote naming client");

        Ok(Self {
            client,
            endpoint,
            model,
            prompt: prompt.into(),
            probe_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(3),
            cache_ttl: Duration::from_secs(60),
            availability: Mutex::new(None),
        })
    }

    pub fn from_config(config: &NamingConfig) -> Result<Self, NamingError> {
        Ok(Self::new(&config.endpoint, &config.model, &config.prompt)?
            .with_timeouts(config.probe_timeout(), config.request_timeout())
            .with_cache_ttl(config.availability_ttl()))
    }

    pub fn with_timeouts(mut self, probe: Duration, request: Duration) -> Self {
        self.probe_timeout = probe;
        self.request_timeout = request;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the service answers `GET /api/tags` with a 2xx status.
    ///
    /// A result younger than the cache TTL is reused. Every probe, failed
    /// or not, refreshes the cache.
    pub async fn is_available(&self) -> bool {
        if let Some(cached) = self.cached_availability() {
            debug!("Using cached availability: {}", cached);
            return cached;
        }

        let url = format!("{}/api/tags", self.endpoint);
        let probe = self.client.get(&url).timeout(self.probe_timeout).send();

        let available = match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(response)) => {
                let ok = response.status().is_success();
                if !ok {
                    debug!("{} returned HTTP {}", url, response.status());
                }
                ok
            }
            Ok(Err(e)) => {
                debug!("Naming service unreachable: {}", e);
                false
            }
            Err(_) => {
                debug!("Naming service probe timed out after {:?}", self.probe_timeout);
                false
            }
        };

        self.store_availability(available);
        available
    }

    /// Ask the service for a file name describing `image`
    pub async fn analyze_image(&self, image: &[u8]) -> Result<String, NamingError> {
        match tokio::time::timeout(self.request_timeout, self.generate(image)).await {
            Ok(result) => result,
            Err(_) => Err(NamingError::Timeout(self.request_timeout)),
        }
    }

    /// Forget the cached availability
    pub fn reset_availability(&self) {
        if let Ok(mut cache) = self.availability.lock() {
            *cache = None;
        }
    }

    async fn generate(&self, image: &[u8]) -> Result<String, NamingError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt: &self.prompt,
            images: vec![STANDARD.encode(image)],
            stream: false,
        };

        debug!("Requesting name for {} byte image from {}", image.len(), url);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NamingError::Upstream(format!("{} returned HTTP {}", url, status)));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            NamingError::InvalidResponse(format!("{} (body: {})", e, preview))
        })?;

        if !parsed.done {
            debug!("Naming service reported an unfinished generation");
        }

        let raw = parsed
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| NamingError::InvalidResponse("missing response text".to_string()))?;

        let name = clean_suggestion(&raw);
        if name.is_empty() {
            warn!("Naming service answer '{}' cleaned to nothing", raw);
            return Err(NamingError::InvalidResponse(format!(
                "no usable characters in '{}'",
                raw
            )));
        }

        Ok(name)
    }

    fn transport_error(&self, e: reqwest::Error) -> NamingError {
        if e.is_timeout() {
            NamingError::Timeout(self.request_timeout)
        } else {
            NamingError::Upstream(e.to_string())
        }
    }

    fn cached_availability(&self) -> Option<bool> {
        let cache = *self.availability.lock().ok()?;
        cache
            .filter(|entry| entry.last_checked.elapsed() < self.cache_ttl)
            .map(|entry| entry.last_result)
    }

    fn store_availability(&self, available: bool) {
        if let Ok(mut cache) = self.availability.lock() {
            *cache = Some(AvailabilityCache {
                last_result: available,
                last_checked: Instant::now(),
            });
        }
    }
}

#[async_trait]
impl NameSuggester for RemoteNamingClient {
    async fn is_available(&self) -> bool {
        RemoteNamingClient::is_available(self).await
    }

    async fn suggest_name(&self, image: &[u8]) -> Result<String, NamingError> {
        self.analyze_image(image).await
    }
}

/// Reduce a free-form model answer to `[a-z0-9-]`
pub fn clean_suggestion(response: &str) -> String {
    let text = QUOTES.replace_all(response.trim(), "");
    let text = WHITESPACE.replace_all(&text, "-");
    let text = DISALLOWED.replace_all(&text, "");
    let text = HYPHENS.replace_all(&text, "-");
    text.trim_matches('-').to_lowercase()
}
