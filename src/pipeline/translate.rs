//! Translation: source text + target language → translated text.
//!
//! Like extraction, the model call sits behind a trait ([`Translator`]) and
//! this module adds the shared behaviour: input validation, the timeout and
//! output cleanup. No source-language detection happens here; the model is
//! expected to infer it.

use crate::catalog::Language;
use crate::config::PipelineConfig;
use crate::error::{FailureKind, TranslationError};
use crate::pipeline::postprocess::clean_text;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError>;
}

#[derive(Clone)]
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    max_text_chars: usize,
    timeout: Duration,
}

impl TranslationPipeline {
    pub fn new(translator: Arc<dyn Translator>, config: &PipelineConfig) -> Self {
        Self {
            translator,
            max_text_chars: config.max_text_chars,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    /// Translate `text` into `target_language` (a catalog language name).
    ///
    /// Blank or oversized text and unknown languages are rejected before any
    /// external call is made. An empty answer from the translator is a
    /// malformed response, never a successful empty translation.
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::invalid("text is empty"));
        }
        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(TranslationError::invalid(format!(
                "text is {chars} characters, limit is {}",
                self.max_text_chars
            )));
        }
        let target: Language = target_language
            .parse()
            .map_err(|e: crate::error::ValidationError| TranslationError::invalid(e.to_string()))?;

        let start = Instant::now();
        let call = self.translator.translate(text, target);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    translator = self.translator.name(),
                    "Translation call timed out after {:?}", self.timeout
                );
                return Err(TranslationError::ServiceFailure {
                    kind: FailureKind::Timeout,
                    message: format!("no answer after {}s", self.timeout.as_secs()),
                });
            }
        };

        let translated = clean_text(&raw);
        if translated.is_empty() {
            return Err(TranslationError::ServiceFailure {
                kind: FailureKind::MalformedResponse,
                message: "translator returned no text".into(),
            });
        }
        info!(
            translator = self.translator.name(),
            target = %target,
            chars = translated.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Translation complete"
        );
        Ok(translated)
    }
}

impl std::fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("translator", &self.translator.name())
            .field("max_text_chars", &self.max_text_chars)
            .field("timeout", &self.timeout)
            .finish()
    }
}
