//! OCR extraction: document image bytes → plain text.
//!
//! The recogniser itself is a collaborator behind [`OcrEngine`]: an LLM vision
//! model ([`crate::pipeline::llm::LlmOcrEngine`]), the HTTP backend
//! ([`crate::backend::BackendClient`]) or a test double. This module owns what
//! is common to all of them: image validation, the per-call timeout and text
//! cleanup. There is no retry here; a failed extraction surfaces to the
//! workflow, which lets the user retry or skip.

use crate::config::PipelineConfig;
use crate::error::{ExtractionError, FailureKind};
use crate::pipeline::imaging::{prepare_image, PreparedImage};
use crate::pipeline::postprocess::clean_text;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Something that can read the text off an image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier for logs, e.g. `"llm:gpt-4.1-nano"` or `"backend"`.
    fn name(&self) -> &str;

    /// Recognise the text of one image. `language_hint` is an OCR language
    /// code such as `"eng"`.
    async fn recognize(
        &self,
        image: &PreparedImage,
        language_hint: &str,
    ) -> Result<String, ExtractionError>;
}

/// Validates uploads and drives one OCR call per extraction.
#[derive(Clone)]
pub struct ExtractionPipeline {
    engine: Arc<dyn OcrEngine>,
    language_hint: String,
    max_image_bytes: usize,
    max_image_pixels: u32,
    timeout: Duration,
}

impl ExtractionPipeline {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &PipelineConfig) -> Self {
        Self {
            engine,
            language_hint: config.ocr_language_hint.clone(),
            max_image_bytes: config.max_image_bytes,
            max_image_pixels: config.max_image_pixels,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Extract the text of a document image.
    ///
    /// Whitespace-only output is a success with empty text, not an error:
    /// a blank page is a legitimate scan.
    pub async fn extract(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let prepared = self.prepare(image_bytes).await?;
        debug!(
            engine = self.engine.name(),
            "Extracting text from {}x{} {}",
            prepared.width,
            prepared.height,
            prepared.mime_type
        );

        let call = self.engine.recognize(&prepared, &self.language_hint);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    engine = self.engine.name(),
                    "OCR call timed out after {:?}", self.timeout
                );
                return Err(ExtractionError::ServiceFailure {
                    kind: FailureKind::Timeout,
                    message: format!("no answer after {}s", self.timeout.as_secs()),
                });
            }
        };

        let text = clean_text(&raw);
        info!(
            engine = self.engine.name(),
            chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extraction complete"
        );
        Ok(text)
    }

    async fn prepare(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        // Decoding and resizing are CPU-bound; keep them off the async workers.
        let bytes = image_bytes.to_vec();
        let (max_bytes, max_pixels) = (self.max_image_bytes, self.max_image_pixels);
        tokio::task::spawn_blocking(move || prepare_image(&bytes, max_bytes, max_pixels))
            .await
            .map_err(|e| ExtractionError::InvalidImage {
                reason: format!("image preparation task failed: {e}"),
            })?
    }
}

impl std::fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("engine", &self.engine.name())
            .field("language_hint", &self.language_hint)
            .field("timeout", &self.timeout)
            .finish()
    }
}
