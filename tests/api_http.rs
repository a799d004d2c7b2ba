// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/videos          (pagination + lenient param handling)
// - GET /api/videos/search   (partial matching, empty-q is 400)
// - GET /api/videos/youtube-search (live search via stubbed backend)

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use tubefeed::youtube::{RawItemId, RawSearchItem, RawSnippet, RawThumbnails, SearchParams};
use tubefeed::{
    create_router, ApiKeyPool, AppState, MemoryStore, SearchBackend, Thumbnails, Video,
    VideoStore, YouTubeClient,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Backend returning a fixed number of synthetic items regardless of key.
struct StubBackend {
    items: usize,
}

#[async_trait]
impl SearchBackend for StubBackend {
    async fn search(&self, _api_key: &str, params: &SearchParams) -> Result<Vec<RawSearchItem>> {
        Ok((0..self.items)
            .map(|i| RawSearchItem {
                id: RawItemId {
                    video_id: Some(format!("live-{i}")),
                },
                snippet: RawSnippet {
                    published_at: Some(Utc::now()),
                    title: format!("{} #{i}", params.query),
                    description: String::new(),
                    channel_title: "Live Chan".to_string(),
                    channel_id: "UC_live".to_string(),
                    thumbnails: RawThumbnails::default(),
                },
            })
            .collect())
    }
}

fn video(id: &str, title: &str, description: &str, offset_secs: i64) -> Video {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs);
    Video {
        video_id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        published_at: ts,
        channel_title: "Chan".to_string(),
        channel_id: "UC".to_string(),
        search_query: "test".to_string(),
        thumbnails: Thumbnails::default(),
        created_at: ts,
        updated_at: ts,
    }
}

async fn test_router(seed: Vec<Video>, live_items: usize) -> Router {
    let store = Arc::new(MemoryStore::new());
    for v in seed {
        store.insert(v).await.unwrap();
    }
    let pool = Arc::new(ApiKeyPool::new(vec!["test-key".to_string()]).unwrap());
    let client = Arc::new(YouTubeClient::new(
        Arc::new(StubBackend { items: live_items }),
        Arc::clone(&pool),
        25,
        "IN".to_string(),
        "en".to_string(),
    ));
    create_router(AppState {
        store: store as Arc<dyn VideoStore>,
        client,
        pool,
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse json");
    (status, v)
}

#[tokio::test]
async fn health_reports_pool_status() {
    let app = test_router(vec![], 0).await;
    let (status, v) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["api_status"]["total_keys"], 1);
    assert_eq!(v["api_status"]["working_keys"], 1);
}

#[tokio::test]
async fn list_defaults_to_newest_first_and_page_size_12() {
    let seed: Vec<Video> = (0..15)
        .map(|i| video(&format!("v{i}"), &format!("title {i}"), "", i * 60))
        .collect();
    let app = test_router(seed, 0).await;

    let (status, v) = get_json(app, "/api/videos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 15);
    let results = v["results"].as_array().unwrap();
    assert_eq!(results.len(), 12);
    assert_eq!(results[0]["video_id"], "v14", "newest first by default");
    assert!(v["next"].is_string(), "15 items at size 12 has a next page");
    assert!(v["previous"].is_null());
}

#[tokio::test]
async fn malformed_params_normalize_silently() {
    let seed = vec![video("v0", "t", "", 0)];
    let app = test_router(seed, 0).await;
    let (status, v) =
        get_json(app, "/api/videos?page=abc&page_size=-9&sort=sideways").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 1);
    assert_eq!(v["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_matches_title_or_description() {
    let seed = vec![
        video("v1", "Great Cricket Highlights", "all the best of match day", 0),
        video("v2", "Cooking pasta", "weeknight dinner", 60),
    ];
    let app = test_router(seed, 0).await;
    let (status, v) = get_json(app, "/api/videos/search?q=cricket%20match").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 1);
    assert_eq!(v["results"][0]["video_id"], "v1");
}

#[tokio::test]
async fn empty_search_query_is_rejected() {
    let app = test_router(vec![], 0).await;
    let (status, v) = get_json(app, "/api/videos/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Search query cannot be empty");

    let app = test_router(vec![], 0).await;
    let (status, _) = get_json(app, "/api/videos/youtube-search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn live_search_estimates_total_on_full_page() {
    // Backend returns exactly page_size items -> total is estimated upward.
    let app = test_router(vec![], 12).await;
    let (status, v) = get_json(app, "/api/videos/youtube-search?q=lofi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["results"].as_array().unwrap().len(), 12);
    assert_eq!(v["count"], 120);
    assert!(v["next"].is_string());
}

#[tokio::test]
async fn live_search_short_page_uses_real_count() {
    let app = test_router(vec![], 3).await;
    let (status, v) = get_json(app, "/api/videos/youtube-search?q=lofi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 3);
    assert!(v["next"].is_null());
}
