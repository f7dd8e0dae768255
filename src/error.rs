//! Error types for the edgequake-doctranslate library.
//!
//! Failures are grouped by the component that produces them:
//!
//! * [`ValidationError`] — a gate refused to open (missing field, unknown
//!   catalog entry, unconfirmed review). Blocks the transition, nothing else.
//! * [`ExtractionError`] / [`TranslationError`] — the OCR or translation
//!   collaborator could not produce text. The workflow parks in
//!   `ExtractionFailed` so the user can retry or skip.
//! * [`PaymentError`] — the charge did not go through; the user may re-attempt
//!   from the payment stage.
//! * [`ConfigError`] — the pipelines could not be constructed.
//!
//! [`WorkflowError`] aggregates all of them for the stage controller. None of
//! these are fatal to a session: every failure leaves the
//! [`crate::context::WorkflowContext`] exactly as it was.

use crate::context::StageField;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of an upstream collaborator failure.
///
/// Attached to every `ServiceFailure` so callers can decide whether offering
/// a retry is worthwhile (a rate limit usually is, bad credentials are not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 401/403 or an equivalent provider error.
    Authentication,
    /// 429 or an equivalent provider error.
    RateLimited,
    /// The call did not finish within the configured timeout.
    Timeout,
    /// The collaborator answered, but not with the expected structure.
    MalformedResponse,
    /// Connection refused, DNS failure, TLS error, ...
    Unavailable,
    /// Any other non-success answer.
    Upstream,
}

impl FailureKind {
    /// Map an HTTP status code to a failure kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FailureKind::Authentication,
            429 => FailureKind::RateLimited,
            408 | 504 => FailureKind::Timeout,
            502 | 503 => FailureKind::Unavailable,
            _ => FailureKind::Upstream,
        }
    }

    /// Best-effort classification of a provider error message.
    ///
    /// LLM provider errors arrive as opaque strings; the status code is
    /// usually embedded in them.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("api key")
            || lower.contains("authentication")
        {
            FailureKind::Authentication
        } else if lower.contains("429") || lower.contains("rate limit") {
            FailureKind::RateLimited
        } else if lower.contains("timed out") || lower.contains("timeout") {
            FailureKind::Timeout
        } else if lower.contains("connection") || lower.contains("dns") {
            FailureKind::Unavailable
        } else {
            FailureKind::Upstream
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Authentication => "authentication",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Timeout => "timeout",
            FailureKind::MalformedResponse => "malformed response",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Upstream => "upstream error",
        };
        f.write_str(s)
    }
}

/// A gated transition was refused because its inputs are incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field the transition depends on is absent or blank.
    #[error("Required field '{0}' is missing")]
    MissingField(StageField),

    /// The document type is not in the catalog at all.
    #[error("Unknown document type '{0}'")]
    UnknownDocumentType(String),

    /// The language is not one of the catalog languages.
    #[error("Unknown language '{0}'\nSupported: German, French, English, Spanish, Italian.")]
    UnknownLanguage(String),

    /// The template id does not match any option offered for the origin country.
    #[error("Unknown template option '{id}' for {country}")]
    UnknownTemplate { id: String, country: String },

    /// `ReviewData → Payment` requires an explicit confirmation.
    #[error("Review data has not been confirmed")]
    ReviewNotConfirmed,

    /// A stage tried to write a field it does not own.
    #[error("Stage {stage} may not write field '{field}'")]
    FieldNotWritable { stage: Stage, field: StageField },
}

/// OCR failed to produce text for a document image.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// Image bytes are empty, truncated, in an unsupported format or too large.
    #[error("Invalid document image: {reason}")]
    InvalidImage { reason: String },

    /// The OCR collaborator timed out or answered with a non-success response.
    #[error("OCR service failure ({kind}): {message}")]
    ServiceFailure { kind: FailureKind, message: String },
}

/// Translation failed to produce text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TranslationError {
    /// Empty or oversized text, or an unrecognised target language.
    #[error("Invalid translation input: {reason}")]
    InvalidInput { reason: String },

    /// Authentication, rate-limit, timeout or malformed-response conditions.
    #[error("Translation service failure ({kind}): {message}")]
    ServiceFailure { kind: FailureKind, message: String },
}

impl TranslationError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        TranslationError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// The payment step did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The charge was refused (card declined, proof rejected, ...).
    #[error("Payment declined: {reason}")]
    Declined { reason: String },

    /// The payment provider could not be reached.
    #[error("Payment service unavailable: {message}\nPlease try again.")]
    ServiceUnavailable { message: String },
}

/// Pipelines could not be constructed from the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },
}

/// Every error the stage controller can return.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A catalog document type that has no workflow yet.
    #[error("'{document_type}' is not yet supported. Only passports can be translated at the moment.")]
    Unsupported { document_type: String },

    /// The requested operation is not available in the current stage.
    #[error("Cannot {action} while in stage {stage}")]
    InvalidTransition { stage: Stage, action: &'static str },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
