// src/store/memory.rs
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Video;
use crate::query::{Filter, SortSpec};
use crate::store::VideoStore;

/// In-process store with the same filter/sort/paginate semantics the
/// production document store is expected to provide.
#[derive(Debug, Default)]
pub struct MemoryStore {
    videos: RwLock<Vec<Video>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching_sorted(&self, filter: &Filter, sort: SortSpec) -> Vec<Video> {
        let videos = self.videos.read().expect("rwlock poisoned");
        let mut out: Vec<Video> = videos.iter().filter(|v| filter.matches(v)).cloned().collect();
        out.sort_by(|a, b| sort.cmp(a, b));
        out
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn count(&self, filter: &Filter) -> Result<u64> {
        let videos = self.videos.read().expect("rwlock poisoned");
        Ok(videos.iter().filter(|v| filter.matches(v)).count() as u64)
    }

    async fn find(
        &self,
        filter: &Filter,
        sort: SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Video>> {
        let out = self.matching_sorted(filter, sort);
        Ok(out
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_one(&self, filter: &Filter, sort: SortSpec) -> Result<Option<Video>> {
        Ok(self.matching_sorted(filter, sort).into_iter().next())
    }

    async fn insert(&self, video: Video) -> Result<()> {
        let mut videos = self.videos.write().expect("rwlock poisoned");
        if videos.iter().any(|v| v.video_id == video.video_id) {
            bail!("duplicate video_id: {}", video.video_id);
        }
        videos.push(video);
        Ok(())
    }
}
