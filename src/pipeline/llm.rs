//! LLM-backed collaborators: vision OCR and chat translation.
//!
//! Both adapters are thin. Prompt wording lives in [`crate::prompts`]; timeouts
//! and cleanup live in the extraction and translation pipelines. What is left
//! here is message layout, completion options and mapping provider errors to
//! [`FailureKind`].
//!
//! ## Message Layout
//!
//! OCR: system prompt, then one user turn carrying the image with empty text.
//! Translation: system prompt naming the target language, then the source
//! text as the user turn.

use crate::catalog::Language;
use crate::config::PipelineConfig;
use crate::error::{ConfigError, ExtractionError, FailureKind, TranslationError};
use crate::pipeline::extract::OcrEngine;
use crate::pipeline::imaging::PreparedImage;
use crate::pipeline::translate::Translator;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Reads document images with a vision-capable chat model.
pub struct LlmOcrEngine {
    provider: Arc<dyn LLMProvider>,
    name: String,
    options: CompletionOptions,
}

impl LlmOcrEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            name: engine_name(config),
            options: build_options(config),
        }
    }
}

#[async_trait]
impl OcrEngine for LlmOcrEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(
        &self,
        image: &PreparedImage,
        language_hint: &str,
    ) -> Result<String, ExtractionError> {
        let messages = ocr_messages(image, language_hint);
        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "OCR: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("OCR call failed: {}", message);
                Err(ExtractionError::ServiceFailure {
                    kind: FailureKind::classify_message(&message),
                    message,
                })
            }
        }
    }
}

/// Translates with a chat model.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    name: String,
    options: CompletionOptions,
    system_prompt: Option<String>,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            name: engine_name(config),
            options: build_options(config),
            system_prompt: config.translation_system_prompt.clone(),
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let messages = translation_messages(text, target, self.system_prompt.as_deref());
        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "Translation: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                if response.content.trim().is_empty() {
                    return Err(TranslationError::ServiceFailure {
                        kind: FailureKind::MalformedResponse,
                        message: "completion has no content".into(),
                    });
                }
                Ok(response.content)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Translation call failed: {}", message);
                Err(TranslationError::ServiceFailure {
                    kind: FailureKind::classify_message(&message),
                    message,
                })
            }
        }
    }
}

fn ocr_messages(image: &PreparedImage, language_hint: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::ocr_prompt(language_hint)),
        ChatMessage::user_with_images("", vec![image.to_image_data()]),
    ]
}

fn translation_messages(text: &str, target: Language, custom: Option<&str>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::translation_prompt(target, custom)),
        ChatMessage::user(text),
    ]
}

fn engine_name(config: &PipelineConfig) -> String {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    match config.provider_name.as_deref() {
        Some(provider) => format!("llm:{provider}/{model}"),
        None => format!("llm:{model}"),
    }
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ConfigError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ConfigError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, `OPENROUTER_API_KEY`, ...) from
///    the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when
///    both are set.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, ConfigError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ConfigError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, OPENROUTER_API_KEY, ANTHROPIC_API_KEY, \
                or point --backend at a running translation backend.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
