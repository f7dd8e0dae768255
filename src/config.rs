//! Configuration for the extraction and translation pipelines.
//!
//! All collaborator wiring is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Credentials are never stored here: LLM
//! providers read their API keys from the environment (or are injected
//! pre-built), and the backend service keeps its own.

use crate::error::ConfigError;
use crate::finalize::PricingTable;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for document extraction, translation and pricing.
///
/// # Example
/// ```rust
/// use edgequake_doctranslate::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .backend_url("http://localhost:5001/api")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Base URL of the `/extract` + `/translate` backend. When set, both
    /// pipelines call the backend instead of an LLM provider directly.
    pub backend_url: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "openrouter").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// LLM model identifier, e.g. "gpt-4.1-nano". Must support vision for OCR.
    /// If None, uses "gpt-4.1-nano".
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Language hint passed to the OCR collaborator. Default: "eng".
    pub ocr_language_hint: String,

    /// Sampling temperature for LLM calls. Default: 0.1.
    ///
    /// Transcription and document translation both want the most literal
    /// output the model can give.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Per-collaborator-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Largest accepted image upload in bytes. Default: 20 MiB.
    pub max_image_bytes: usize,

    /// Longest edge, in pixels, sent to the OCR collaborator. Larger images
    /// are downscaled first. Default: 2000.
    pub max_image_pixels: u32,

    /// Longest text, in characters, accepted for translation. Default: 20 000.
    pub max_text_chars: usize,

    /// Custom translation system prompt. `{language}` is replaced with the
    /// target language name. If None, uses the built-in prompt.
    pub translation_system_prompt: Option<String>,

    /// Prices for the finalization gate.
    pub pricing: PricingTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            provider_name: None,
            model: None,
            provider: None,
            ocr_language_hint: "eng".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 60,
            max_image_bytes: 20 * 1024 * 1024,
            max_image_pixels: 2000,
            max_text_chars: 20_000,
            translation_system_prompt: None,
            pricing: PricingTable::default(),
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("backend_url", &self.backend_url)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("ocr_language_hint", &self.ocr_language_hint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("max_image_pixels", &self.max_image_pixels)
            .field("max_text_chars", &self.max_text_chars)
            .field("pricing", &self.pricing)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn ocr_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.config.ocr_language_hint = hint.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(100);
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn translation_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.translation_system_prompt = Some(prompt.into());
        self
    }

    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.config.pricing = pricing;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let c = &self.config;
        if let Some(ref url) = c.backend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Backend URL must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if c.ocr_language_hint.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "OCR language hint must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_text_chars == 0 || c.max_image_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "Size limits must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
