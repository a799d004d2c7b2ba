// src/youtube.rs
//
// Client for the YouTube Data API v3 `search.list` call. One fetch serves one
// topic; on any provider failure the active API key is marked exhausted and
// the call retries after rotating the pool, at most once per configured key.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::keypool::ApiKeyPool;
use crate::models::{Thumbnails, Video};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider ordering modes supported by `search.list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    Date,
    Title,
    Relevance,
}

impl SearchOrder {
    /// Map a caller-facing sort hint onto a provider ordering. Unrecognized
    /// hints fall back to relevance, the provider default.
    pub fn from_hint(hint: &str) -> Self {
        match hint {
            "latest" | "oldest" => SearchOrder::Date,
            "title" => SearchOrder::Title,
            _ => SearchOrder::Relevance,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Title => "title",
            SearchOrder::Relevance => "relevance",
        }
    }
}

/// One provider query, fully specified.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub order: SearchOrder,
    pub published_after: Option<DateTime<Utc>>,
    pub max_results: u32,
    pub region_code: String,
    pub relevance_language: String,
}

// Raw response shapes, trimmed to the fields we keep.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchItem {
    pub id: RawItemId,
    pub snippet: RawSnippet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItemId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnippet {
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub thumbnails: RawThumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThumbnails {
    pub default: Option<RawThumbnail>,
    pub medium: Option<RawThumbnail>,
    pub high: Option<RawThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawThumbnail {
    pub url: String,
}

fn thumbnail_url(thumb: Option<&RawThumbnail>) -> String {
    thumb.map(|t| t.url.clone()).unwrap_or_default()
}

/// Seam to the external provider, so the rotation/retry logic is testable
/// without network access.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, api_key: &str, params: &SearchParams) -> Result<Vec<RawSearchItem>>;
}

/// reqwest-backed provider call with a bounded per-request timeout.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, api_key: &str, params: &SearchParams) -> Result<Vec<RawSearchItem>> {
        let mut req = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", params.query.as_str()),
                ("order", params.order.as_str()),
                ("regionCode", params.region_code.as_str()),
                ("relevanceLanguage", params.relevance_language.as_str()),
                ("safeSearch", "moderate"),
                ("key", api_key),
            ])
            .query(&[("maxResults", params.max_results)]);

        if let Some(after) = params.published_after {
            req = req.query(&[(
                "publishedAfter",
                after.to_rfc3339_opts(SecondsFormat::Secs, true),
            )]);
        }

        let resp = req
            .send()
            .await
            .context("youtube search request")?
            .error_for_status()
            .context("youtube search status")?;

        let body: SearchResponse = resp.json().await.context("youtube search body")?;
        Ok(body.items)
    }
}

/// Search client shared by the background fetcher and the live-search path.
pub struct YouTubeClient {
    backend: Arc<dyn SearchBackend>,
    pool: Arc<ApiKeyPool>,
    max_results: u32,
    region_code: String,
    relevance_language: String,
}

impl YouTubeClient {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        pool: Arc<ApiKeyPool>,
        max_results: u32,
        region_code: String,
        relevance_language: String,
    ) -> Self {
        Self {
            backend,
            pool,
            max_results,
            region_code,
            relevance_language,
        }
    }

    pub fn pool(&self) -> Arc<ApiKeyPool> {
        Arc::clone(&self.pool)
    }

    /// Fetch the newest videos for one topic, bounded below by
    /// `published_after`. Provider failures rotate the key pool and retry;
    /// the loop runs at most once per configured key before giving up with
    /// an all-keys-exhausted error.
    pub async fn fetch(&self, topic: &str, published_after: DateTime<Utc>) -> Result<Vec<Video>> {
        let params = SearchParams {
            query: topic.to_string(),
            order: SearchOrder::Date,
            published_after: Some(published_after),
            max_results: self.max_results,
            region_code: self.region_code.clone(),
            relevance_language: self.relevance_language.clone(),
        };
        let items = self.call_with_rotation(&params).await?;
        Ok(self.normalize(items, topic))
    }

    /// One-shot search without the watermark/rotation ceremony, for the
    /// interactive search endpoint.
    pub async fn search_live(
        &self,
        topic: &str,
        max_results: u32,
        order_hint: &str,
    ) -> Result<Vec<Video>> {
        let params = SearchParams {
            query: topic.to_string(),
            order: SearchOrder::from_hint(order_hint),
            published_after: None,
            max_results,
            region_code: self.region_code.clone(),
            relevance_language: self.relevance_language.clone(),
        };
        let (_, key) = self.pool.current();
        let items = self
            .backend
            .search(&key, &params)
            .await
            .context("youtube live search")?;
        Ok(self.normalize(items, topic))
    }

    async fn call_with_rotation(&self, params: &SearchParams) -> Result<Vec<RawSearchItem>> {
        let mut last_err: Option<anyhow::Error> = None;

        // Bounded: one attempt per configured key at most.
        for _ in 0..self.pool.len() {
            let (index, key) = self.pool.current();
            let t0 = std::time::Instant::now();
            match self.backend.search(&key, params).await {
                Ok(items) => {
                    histogram!("youtube_search_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    return Ok(items);
                }
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        topic = %params.query,
                        key_index = index,
                        "provider call failed, rotating API key"
                    );
                    counter!("youtube_call_failures_total").increment(1);
                    self.pool.mark_exhausted(index);
                    last_err = Some(e);
                    if !self.pool.rotate() {
                        break;
                    }
                }
            }
        }

        counter!("youtube_keys_exhausted_total").increment(1);
        Err(match last_err {
            Some(e) => e.context("all API keys exhausted"),
            None => anyhow!("all API keys exhausted"),
        })
    }

    fn normalize(&self, items: Vec<RawSearchItem>, topic: &str) -> Vec<Video> {
        let now = Utc::now();
        items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let snippet = item.snippet;
                Some(Video {
                    video_id,
                    title: snippet.title,
                    description: snippet.description,
                    published_at: snippet.published_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                    channel_title: snippet.channel_title,
                    channel_id: snippet.channel_id,
                    search_query: topic.to_string(),
                    thumbnails: Thumbnails {
                        default: thumbnail_url(snippet.thumbnails.default.as_ref()),
                        medium: thumbnail_url(snippet.thumbnails.medium.as_ref()),
                        high: thumbnail_url(snippet.thumbnails.high.as_ref()),
                    },
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_hint_mapping() {
        assert_eq!(SearchOrder::from_hint("latest"), SearchOrder::Date);
        assert_eq!(SearchOrder::from_hint("oldest"), SearchOrder::Date);
        assert_eq!(SearchOrder::from_hint("title"), SearchOrder::Title);
        assert_eq!(SearchOrder::from_hint("channel"), SearchOrder::Relevance);
        assert_eq!(SearchOrder::from_hint("???"), SearchOrder::Relevance);
    }

    #[test]
    fn missing_thumbnail_variant_becomes_empty_string() {
        let json = r#"{
            "id": {"videoId": "abc123"},
            "snippet": {
                "publishedAt": "2024-06-01T12:00:00Z",
                "title": "A title",
                "description": "A description",
                "channelTitle": "A channel",
                "channelId": "UC1",
                "thumbnails": {"default": {"url": "http://img/default.jpg"}}
            }
        }"#;
        let item: RawSearchItem = serde_json::from_str(json).unwrap();
        assert_eq!(thumbnail_url(item.snippet.thumbnails.default.as_ref()), "http://img/default.jpg");
        assert_eq!(thumbnail_url(item.snippet.thumbnails.medium.as_ref()), "");
        assert_eq!(thumbnail_url(item.snippet.thumbnails.high.as_ref()), "");
    }

    #[test]
    fn item_without_video_id_is_dropped_by_normalize() {
        let json = r#"{"id": {}, "snippet": {"publishedAt": null}}"#;
        let item: RawSearchItem = serde_json::from_str(json).unwrap();
        assert!(item.id.video_id.is_none());
    }
}
