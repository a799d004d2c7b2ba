// src/store/mod.rs
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Video;
use crate::query::{Filter, SortSpec};

/// Document-store surface the core depends on. The production backend lives
/// behind this trait; `memory::MemoryStore` implements it for the default
/// binary wiring and for tests.
///
/// `video_id` is unique: `insert` of a duplicate fails, and callers are
/// expected to check existence first via `find_one(Filter::VideoId(..))`.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn count(&self, filter: &Filter) -> Result<u64>;

    async fn find(
        &self,
        filter: &Filter,
        sort: SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Video>>;

    async fn find_one(&self, filter: &Filter, sort: SortSpec) -> Result<Option<Video>>;

    async fn insert(&self, video: Video) -> Result<()>;
}
