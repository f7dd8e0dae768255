//! HTTP client for the `/extract` + `/translate` backend.
//!
//! The backend keeps the OCR engine and the translation API key on the server
//! side. Its wire format is two JSON endpoints:
//!
//! ```text
//! POST /extract    { "imageBase64": "..." }                  → { "extractedText": "..." }
//! POST /translate  { "text": "...", "targetLanguage": "..." } → { "translatedText": "..." }
//! any failure      → non-2xx with { "error": "..." }
//! ```
//!
//! [`BackendClient`] implements both [`OcrEngine`] and [`Translator`], so the
//! pipelines can run against a remote backend exactly as they run against an
//! LLM provider. The same wire types are served by [`crate::server`].

use crate::catalog::Language;
use crate::error::{ConfigError, ExtractionError, FailureKind, TranslationError};
use crate::pipeline::extract::OcrEngine;
use crate::pipeline::imaging::PreparedImage;
use crate::pipeline::translate::Translator;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    /// Plain base64, or a `data:<mime>;base64,` URL.
    pub image_base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub extracted_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

struct CallFailure {
    kind: FailureKind,
    message: String,
}

impl BackendClient {
    /// `base_url` is the prefix the endpoints hang off, e.g.
    /// `http://localhost:5001/api`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, CallFailure>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                FailureKind::Timeout
            } else if e.is_connect() {
                FailureKind::Unavailable
            } else {
                FailureKind::Upstream
            };
            warn!("POST {} failed: {}", url, e);
            CallFailure {
                kind,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| CallFailure {
            kind: if e.is_timeout() {
                FailureKind::Timeout
            } else {
                FailureKind::Upstream
            },
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            warn!("POST {} returned {}: {}", url, status, message);
            return Err(CallFailure {
                kind: FailureKind::from_status(status.as_u16()),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| CallFailure {
            kind: FailureKind::MalformedResponse,
            message: format!("unexpected response body from {path}: {e}"),
        })
    }
}

#[async_trait]
impl OcrEngine for BackendClient {
    fn name(&self) -> &str {
        "backend"
    }

    /// The backend runs its own OCR language; the hint is not sent.
    async fn recognize(
        &self,
        image: &PreparedImage,
        _language_hint: &str,
    ) -> Result<String, ExtractionError> {
        let request = ExtractRequest {
            image_base64: image.to_base64(),
        };
        self.post::<_, ExtractResponse>("extract", &request)
            .await
            .map(|r| r.extracted_text)
            .map_err(|f| ExtractionError::ServiceFailure {
                kind: f.kind,
                message: f.message,
            })
    }
}

#[async_trait]
impl Translator for BackendClient {
    fn name(&self) -> &str {
        "backend"
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            text: text.to_string(),
            target_language: target.name().to_string(),
        };
        self.post::<_, TranslateResponse>("translate", &request)
            .await
            .map(|r| r.translated_text)
            .map_err(|f| TranslationError::ServiceFailure {
                kind: f.kind,
                message: f.message,
            })
    }
}
