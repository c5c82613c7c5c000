//! Feed API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use photofeed_core::{FeedError, FeedStatus, FetchError, PageOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::types::PhotoResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Full feed: status plus the ordered photo list.
#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub status: FeedStatus,
    pub photos: Vec<PhotoResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchInputRequest {
    pub text: String,
}

/// Result of a page request.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    #[serde(flatten)]
    pub outcome: PageOutcome,
    pub status: FeedStatus,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn feed_error(err: FeedError) -> ApiError {
    let status = match &err {
        FeedError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        FeedError::Fetch(FetchError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        FeedError::Fetch(FetchError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        FeedError::Fetch(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Get feed status and photos
pub async fn get_feed(State(state): State<Arc<AppState>>) -> Json<FeedResponse> {
    let feed = state.feed();
    let status = feed.status().await;
    let photos = feed
        .snapshot()
        .await
        .into_iter()
        .map(PhotoResponse::from)
        .collect();

    Json(FeedResponse { status, photos })
}

/// Get feed status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<FeedStatus> {
    Json(state.feed().status().await)
}

/// Get a single photo by id
pub async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PhotoResponse>, ApiError> {
    state
        .feed()
        .store()
        .get(&id)
        .await
        .map(|photo| Json(PhotoResponse::from(photo)))
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Photo not found: {}", id)))
}

/// Start a new search and load its first page
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<PageResponse>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "query must not be empty",
        ));
    }

    info!(query, "Search requested");
    let outcome = state.feed().search(query).await.map_err(feed_error)?;
    let status = state.feed().status().await;
    Ok(Json(PageResponse { outcome, status }))
}

/// Submit search-as-you-type input; the search runs after the quiet period
pub async fn search_input(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchInputRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if !state.debouncer().submit(request.text).await {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "search input is no longer accepted",
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Search input accepted".to_string(),
        }),
    ))
}

/// Request the next page of the active query
pub async fn next_page(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PageResponse>, ApiError> {
    let outcome = state
        .feed()
        .request_next_page()
        .await
        .map_err(feed_error)?;
    let status = state.feed().status().await;
    Ok(Json(PageResponse { outcome, status }))
}

/// Clear photos and pagination, keeping the query
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<FeedStatus>, ApiError> {
    state.feed().reset().await.map_err(feed_error)?;
    Ok(Json(state.feed().status().await))
}
