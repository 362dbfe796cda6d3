//! Configuration for the extraction pipeline
//!
//! Limits have fixed defaults; the vision backend is resolved from the
//! environment (`AZURE_OPENAI_*`) and injected into the orchestrator.

use std::time::Duration;

/// Default maximum document size (10 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
/// Trimmed text-layer length below which the vision fallback runs
pub const DEFAULT_MIN_TEXT_CHARS: usize = 50;
/// Pages sent to the vision fallback at most
pub const DEFAULT_MAX_VISION_PAGES: usize = 5;
/// Render resolution for the vision fallback
pub const DEFAULT_RENDER_DPI: u32 = 150;

const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_API_VERSION: &str = "2024-08-01-preview";

/// Bounds applied to every extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionLimits {
    /// Largest accepted document in bytes
    pub max_document_bytes: usize,
    /// Fallback trigger threshold on the trimmed text length
    pub min_text_chars: usize,
    /// Page cap for the vision fallback
    pub max_vision_pages: usize,
    /// Render resolution, relative to the 72 DPI page-unit baseline
    pub render_dpi: u32,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            max_vision_pages: DEFAULT_MAX_VISION_PAGES,
            render_dpi: DEFAULT_RENDER_DPI,
        }
    }
}

/// Azure OpenAI deployment used for vision OCR
#[derive(Debug, Clone, PartialEq)]
pub struct VisionConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: Option<String>,
    pub api_version: String,
    /// Output ceiling per page
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout for recognition calls
    pub request_timeout: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: Some(DEFAULT_DEPLOYMENT.to_string()),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: 4000,
            temperature: 0.1,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl VisionConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - AZURE_OPENAI_ENDPOINT: resource endpoint URL
    /// - AZURE_OPENAI_API_KEY: access key
    /// - AZURE_OPENAI_DEPLOYMENT: deployment name (default: "gpt-4o")
    /// - AZURE_OPENAI_API_VERSION: API version (default: "2024-08-01-preview")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            endpoint: non_empty("AZURE_OPENAI_ENDPOINT"),
            api_key: non_empty("AZURE_OPENAI_API_KEY"),
            deployment: non_empty("AZURE_OPENAI_DEPLOYMENT").or(defaults.deployment),
            api_version: non_empty("AZURE_OPENAI_API_VERSION").unwrap_or(defaults.api_version),
            ..defaults
        }
    }

    /// Set endpoint, key and deployment in one go
    pub fn with_credentials(mut self, endpoint: &str, api_key: &str, deployment: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self.api_key = Some(api_key.to_string());
        self.deployment = Some(deployment.to_string());
        self
    }

    /// True when endpoint, key and deployment are all present
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some() && self.deployment.is_some()
    }

    /// Names of the missing settings, for diagnostics
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint.is_none() {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        if self.api_key.is_none() {
            missing.push("AZURE_OPENAI_API_KEY");
        }
        if self.deployment.is_none() {
            missing.push("AZURE_OPENAI_DEPLOYMENT");
        }
        missing
    }
}
