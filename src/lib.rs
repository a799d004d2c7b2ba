// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod fetcher;
pub mod keypool;
pub mod metrics;
pub mod models;
pub mod query;
pub mod store;
pub mod youtube;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::fetcher::{CycleStats, VideoFetcher};
pub use crate::keypool::{ApiKeyPool, PoolStatus};
pub use crate::models::{Thumbnails, Video};
pub use crate::query::{Filter, PaginatedResponse, Pagination, SortSpec};
pub use crate::store::{memory::MemoryStore, VideoStore};
pub use crate::youtube::{HttpBackend, SearchBackend, SearchOrder, SearchParams, YouTubeClient};
