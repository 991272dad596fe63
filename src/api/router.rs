//! HTTP routes — thin plumbing over the extraction pipeline.
//!
//! Handlers parse the request, hand the transcript to the pipeline on a
//! blocking worker, and serialize its result. No matching logic lives
//! here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, ExtractResponse, HealthResponse, MatchResponse, TranscriptRequest,
};
use crate::extract::{ExtractedProfile, SemanticExtractor};
use crate::trials::{QueryResult, RegistryClient, DEFAULT_MAX_ROWS};

/// Build the API router with a permissive CORS layer.
pub fn api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/extract", post(extract))
        .route("/api/match", post(match_trials))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
}

/// `GET /api/health` — readiness probe.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// `POST /api/extract` — transcript to structured profile.
async fn extract(
    State(ctx): State<ApiContext>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    if req.transcript.is_empty() {
        return Err(ApiError::MissingTranscript);
    }

    let config = ctx.config.clone();
    let transcript = req.transcript;
    // The pipeline uses synchronous HTTP clients — keep it off the
    // async workers.
    let extracted = tokio::task::spawn_blocking(move || {
        SemanticExtractor::from_config(&config).extract(&transcript)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ExtractResponse { extracted }))
}

/// `POST /api/match` — transcript to profile plus registry matches.
///
/// A total registry failure keeps the body shape and surfaces as 502.
async fn match_trials(
    State(ctx): State<ApiContext>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Response, ApiError> {
    if req.transcript.is_empty() {
        return Err(ApiError::MissingTranscript);
    }

    let config = ctx.config.clone();
    let registry_urls = ctx.registry_urls.clone();
    let transcript = req.transcript;
    let (extracted, results): (ExtractedProfile, QueryResult) =
        tokio::task::spawn_blocking(move || {
            let extracted = SemanticExtractor::from_config(&config).extract(&transcript);
            let results = RegistryClient::with_urls(registry_urls)
                .query_trials(&extracted, DEFAULT_MAX_ROWS);
            (extracted, results)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let status = if results.error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(MatchResponse { extracted, results })).into_response())
}
