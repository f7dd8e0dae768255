//! System prompts for the OCR and translation collaborators.
//!
//! Callers can override the translation prompt via
//! [`crate::config::PipelineConfig::translation_system_prompt`]; the constants
//! here are used only when no override is provided.

use crate::catalog::Language;

/// Default system prompt for transcribing a document photo.
///
/// `{language_hint}` is replaced with the configured OCR language hint.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are an OCR engine for official identity documents. Transcribe ALL visible text from the image exactly as printed.

Rules:
1. Keep the reading order of the document, one printed line per output line.
2. Keep field labels next to their values (e.g. "Date of issue: 12 03 2019").
3. Reproduce the machine-readable zone (the lines made of letters, digits and '<') character for character, without spaces.
4. Do NOT translate, summarise, correct or explain anything.
5. Output plain text only. No Markdown, no code fences, no commentary.

Expected language of the printed text (hint): {language_hint}"#;

/// Default system prompt for translation. `{language}` is the target language.
pub const TRANSLATION_SYSTEM_PROMPT: &str = "Translate the following text into {language}:";

/// Build the OCR system prompt for a language hint.
pub fn ocr_prompt(language_hint: &str) -> String {
    OCR_SYSTEM_PROMPT.replace("{language_hint}", language_hint)
}

/// Build the translation system prompt, honouring an override template.
pub fn translation_prompt(target: Language, custom: Option<&str>) -> String {
    custom
        .unwrap_or(TRANSLATION_SYSTEM_PROMPT)
        .replace("{language}", target.name())
}
