// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::keypool::{ApiKeyPool, PoolStatus};
use crate::models::Video;
use crate::query::{Filter, PaginatedResponse, Pagination, SortSpec};
use crate::store::VideoStore;
use crate::youtube::YouTubeClient;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VideoStore>,
    pub client: Arc<YouTubeClient>,
    pub pool: Arc<ApiKeyPool>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/videos", get(list_videos))
        .route("/api/videos/search", get(search_videos))
        .route("/api/videos/youtube-search", get(youtube_search))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Raw query params; parsed leniently so malformed values normalize to
/// defaults instead of surfacing as errors.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    q: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

impl ListParams {
    fn pagination(&self) -> Pagination {
        let page = self
            .page
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        let page_size = self
            .page_size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(crate::query::DEFAULT_PAGE_SIZE as i64);
        Pagination::clamp(page, page_size)
    }

    fn sort(&self) -> SortSpec {
        SortSpec::from_key(self.sort_key())
    }

    fn sort_key(&self) -> &str {
        self.sort.as_deref().unwrap_or("latest")
    }

    fn query_text(&self) -> &str {
        self.q.as_deref().unwrap_or("").trim()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: msg.to_string(),
            details: None,
        }),
    )
}

fn internal_error(msg: &str, e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "{msg}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: msg.to_string(),
            details: Some(e.to_string()),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    api_status: PoolStatus,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp(),
        api_status: state.pool.status(),
    })
}

async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Video>>, ApiError> {
    paginated(&state, Filter::list(), &params, "/api/videos").await
}

async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Video>>, ApiError> {
    let q = params.query_text();
    if q.is_empty() {
        return Err(bad_request("Search query cannot be empty"));
    }
    paginated(&state, Filter::search(q), &params, "/api/videos/search").await
}

async fn paginated(
    state: &AppState,
    filter: Filter,
    params: &ListParams,
    base_path: &str,
) -> Result<Json<PaginatedResponse<Video>>, ApiError> {
    let pagination = params.pagination();
    let sort = params.sort();

    let total = state
        .store
        .count(&filter)
        .await
        .map_err(|e| internal_error("Failed to fetch videos", e))?;
    let videos = state
        .store
        .find(&filter, sort, pagination.skip(), pagination.page_size)
        .await
        .map_err(|e| internal_error("Failed to fetch videos", e))?;

    Ok(Json(PaginatedResponse::new(
        videos, total, pagination, base_path,
    )))
}

async fn youtube_search(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Video>>, ApiError> {
    let q = params.query_text();
    if q.is_empty() {
        return Err(bad_request("Search query cannot be empty"));
    }
    let pagination = params.pagination();

    let videos = state
        .client
        .search_live(q, pagination.page_size as u32, params.sort_key())
        .await
        .map_err(|e| internal_error("Failed to search YouTube", e))?;

    // Live search has no real total; assume more pages when a full page
    // comes back, mirroring the stored-video response shape.
    let mut total = videos.len() as u64;
    if videos.len() as u64 == pagination.page_size {
        total = pagination.page_size * 10;
    }

    Ok(Json(PaginatedResponse::new(
        videos,
        total,
        pagination,
        "/api/videos/youtube-search",
    )))
}
