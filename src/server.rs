//! The `/extract` + `/translate` backend, hosted with axum.
//!
//! This is the server side of [`crate::backend::BackendClient`]: it keeps the
//! OCR and translation credentials away from the client and exposes the two
//! pipelines over JSON. Every failure is answered with `500 { "error": ... }`,
//! which is the contract existing clients were written against.

use crate::backend::{ErrorBody, ExtractRequest, ExtractResponse, TranslateRequest, TranslateResponse};
use crate::pipeline::Pipelines;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Build the backend router.
///
/// `max_image_bytes` bounds the decoded image; the request body limit is
/// derived from it to leave room for base64 and the JSON envelope.
pub fn router(pipelines: Arc<Pipelines>, max_image_bytes: usize) -> Router {
    let body_limit = max_image_bytes / 3 * 4 + 64 * 1024;
    Router::new()
        .route("/extract", post(extract))
        .route("/translate", post(translate))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(pipelines)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, pipelines: Arc<Pipelines>, max_image_bytes: usize) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Translation backend listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, router(pipelines, max_image_bytes)).await
}

struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: self.0 }),
        )
            .into_response()
    }
}

async fn extract(
    State(pipelines): State<Arc<Pipelines>>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let bytes = decode_image(&request.image_base64).map_err(|e| {
        warn!("POST /extract: {}", e);
        ApiError(e)
    })?;
    match pipelines.extraction.extract(&bytes).await {
        Ok(extracted_text) => Ok(Json(ExtractResponse { extracted_text })),
        Err(e) => {
            warn!("POST /extract failed: {}", e);
            Err(ApiError(e.to_string()))
        }
    }
}

async fn translate(
    State(pipelines): State<Arc<Pipelines>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    match pipelines
        .translation
        .translate(&request.text, &request.target_language)
        .await
    {
        Ok(translated_text) => Ok(Json(TranslateResponse { translated_text })),
        Err(e) => {
            warn!("POST /translate failed: {}", e);
            Err(ApiError(e.to_string()))
        }
    }
}

/// Accept plain base64 or a `data:image/...;base64,` URL.
fn decode_image(encoded: &str) -> Result<Vec<u8>, String> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let payload: String = payload.split_whitespace().collect();
    if payload.is_empty() {
        return Err("imageBase64 is empty".into());
    }
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| format!("imageBase64 is not valid base64: {e}"))
}
