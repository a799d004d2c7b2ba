// src/query.rs
//
// Filter, sort, and pagination specifications shared by the read API and
// the store implementations. Handlers never build store queries directly;
// everything funnels through here so the contracts are testable without a
// running fetch loop.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::models::Video;

/// Storage filter. `Terms` carries one case-insensitive literal pattern per
/// whitespace-separated search word; a video matches when every pattern hits
/// the title or the description.
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    Terms(Vec<Regex>),
    VideoId(String),
}

impl Filter {
    /// The unconditional filter used by the plain listing path.
    pub fn list() -> Self {
        Filter::All
    }

    /// Build the partial-match filter for a user query. Each term must appear
    /// in the title OR the description (AND across terms). Blank input falls
    /// back to the unconditional filter.
    pub fn search(query: &str) -> Self {
        let terms: Vec<Regex> = query
            .split_whitespace()
            .map(|word| {
                RegexBuilder::new(&regex::escape(word))
                    .case_insensitive(true)
                    .build()
                    .expect("escaped search term is a valid pattern")
            })
            .collect();
        if terms.is_empty() {
            Filter::All
        } else {
            Filter::Terms(terms)
        }
    }

    pub fn matches(&self, video: &Video) -> bool {
        match self {
            Filter::All => true,
            Filter::Terms(terms) => terms
                .iter()
                .all(|re| re.is_match(&video.title) || re.is_match(&video.description)),
            Filter::VideoId(id) => video.video_id == *id,
        }
    }
}

/// Concrete orderings the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortSpec {
    /// published_at descending (default)
    Latest,
    /// published_at ascending
    Oldest,
    /// title ascending
    Title,
    /// channel_title ascending, published_at descending within a channel
    Channel,
}

impl SortSpec {
    /// Map a requested sort key; unrecognized keys fall back to `Latest`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "oldest" => SortSpec::Oldest,
            "title" => SortSpec::Title,
            "channel" => SortSpec::Channel,
            _ => SortSpec::Latest,
        }
    }

    pub fn cmp(&self, a: &Video, b: &Video) -> Ordering {
        match self {
            SortSpec::Latest => b.published_at.cmp(&a.published_at),
            SortSpec::Oldest => a.published_at.cmp(&b.published_at),
            SortSpec::Title => a.title.cmp(&b.title),
            SortSpec::Channel => a
                .channel_title
                .cmp(&b.channel_title)
                .then_with(|| b.published_at.cmp(&a.published_at)),
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const MAX_PAGE_SIZE: u64 = 50;

/// Page/page-size pair, already clamped to valid bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Clamp raw query parameters: page >= 1; page_size in [1, 50], with
    /// out-of-range-low values reset to the default of 12. Invalid values
    /// never surface as errors.
    pub fn clamp(page: i64, page_size: i64) -> Self {
        let page = if page < 1 { 1 } else { page as u64 };
        let page_size = if page_size > MAX_PAGE_SIZE as i64 {
            MAX_PAGE_SIZE
        } else if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size as u64
        };
        Self { page, page_size }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Envelope for paginated endpoints: `{results, count, next, previous}`.
/// Links are present only when a further/earlier page exists.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(results: Vec<T>, total: u64, pagination: Pagination, base_path: &str) -> Self {
        let Pagination { page, page_size } = pagination;
        let total_pages = total.div_ceil(page_size);

        let next = (page < total_pages)
            .then(|| format!("{base_path}?page={}&page_size={page_size}", page + 1));
        let previous = (page > 1)
            .then(|| format!("{base_path}?page={}&page_size={page_size}", page - 1));

        Self {
            results,
            count: total,
            next,
            previous,
        }
    }
}
