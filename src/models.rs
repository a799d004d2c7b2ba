// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A video discovered by the background fetcher or by live search.
///
/// `video_id` is the YouTube video id and is unique across the whole store;
/// a second sighting of the same id is skipped, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub channel_title: String,
    pub channel_id: String,
    /// Which configured topic query produced this video.
    pub search_query: String,
    pub thumbnails: Thumbnails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thumbnail URL variants. A variant the provider did not send is an
/// empty string, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnails {
    pub default: String,
    pub medium: String,
    pub high: String,
}
