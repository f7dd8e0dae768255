//! Extraction and translation pipelines.
//!
//! ## Data Flow
//!
//! ```text
//! image bytes ──▶ imaging ──▶ extract ──▶ postprocess ──▶ extracted text
//!                (validate)  (OcrEngine)   (cleanup)
//!
//! extracted text ──▶ translate ──▶ postprocess ──▶ translated text
//!                   (Translator)    (cleanup)
//! ```
//!
//! 1. [`imaging`]     — sniff, decode and downscale uploads; runs in
//!    `spawn_blocking` because decoding is CPU-bound
//! 2. [`extract`]     — the [`OcrEngine`] seam plus timeout handling
//! 3. [`translate`]   — the [`Translator`] seam plus input validation
//! 4. [`llm`]         — LLM provider adapters for both seams
//! 5. [`postprocess`] — deterministic cleanup of collaborator output
//!
//! The HTTP backend client ([`crate::backend::BackendClient`]) implements the
//! same two seams.

pub mod extract;
pub mod imaging;
pub mod llm;
pub mod postprocess;
pub mod translate;

use crate::backend::BackendClient;
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use extract::{ExtractionPipeline, OcrEngine};
pub use translate::{TranslationPipeline, Translator};

/// The two pipelines the loading stage drives.
#[derive(Debug, Clone)]
pub struct Pipelines {
    pub extraction: ExtractionPipeline,
    pub translation: TranslationPipeline,
}

impl Pipelines {
    /// Wire explicit collaborators, e.g. test doubles.
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        translator: Arc<dyn Translator>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            extraction: ExtractionPipeline::new(ocr, config),
            translation: TranslationPipeline::new(translator, config),
        }
    }
}

/// Build both pipelines from configuration.
///
/// A configured `backend_url` wins; otherwise an LLM provider is resolved
/// with [`llm::resolve_provider`] and used for both OCR and translation.
pub fn build_pipelines(config: &PipelineConfig) -> Result<Pipelines, ConfigError> {
    if let Some(ref url) = config.backend_url {
        let client = Arc::new(BackendClient::new(
            url.clone(),
            Duration::from_secs(config.api_timeout_secs),
        )?);
        info!("Using translation backend at {}", client.base_url());
        return Ok(Pipelines::new(client.clone(), client, config));
    }

    let provider = llm::resolve_provider(config)?;
    let ocr = Arc::new(llm::LlmOcrEngine::new(Arc::clone(&provider), config));
    let translator = Arc::new(llm::LlmTranslator::new(provider, config));
    info!("Using LLM provider {}", ocr.name());
    Ok(Pipelines::new(ocr, translator, config))
}
