// src/fetcher.rs
//
// Background polling loop: every tick, compute the watermark from the most
// recently stored video, fetch each configured topic, and persist what the
// store has not seen yet. One topic failing never aborts the cycle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::query::{Filter, SortSpec};
use crate::store::VideoStore;
use crate::youtube::YouTubeClient;

/// Lookback used when the store is empty (or unreadable) and there is no
/// watermark to resume from.
const EMPTY_STORE_LOOKBACK_HOURS: i64 = 2;
/// Slack subtracted from the watermark to tolerate out-of-order publication.
const WATERMARK_SLACK_MINUTES: i64 = 5;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_cycles_total", "Completed fetch cycles.");
        describe_counter!("videos_stored_total", "New videos persisted.");
        describe_counter!("videos_skipped_total", "Already-seen videos skipped.");
        describe_counter!("videos_errored_total", "Per-video store errors.");
        describe_counter!(
            "fetch_topic_errors_total",
            "Topic fetches that failed after key rotation."
        );
        describe_counter!("youtube_call_failures_total", "Failed provider calls.");
        describe_counter!(
            "youtube_keys_exhausted_total",
            "Fetches abandoned with every API key cooling down."
        );
        describe_histogram!("youtube_search_ms", "Provider call time in milliseconds.");
        describe_gauge!("fetch_last_run_ts", "Unix ts when the last cycle finished.");
        describe_gauge!("api_keys_working", "API keys currently usable.");
    });
}

/// Per-cycle outcome counts, for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub stored: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub struct VideoFetcher {
    store: Arc<dyn VideoStore>,
    client: Arc<YouTubeClient>,
    topics: Vec<String>,
    interval: std::time::Duration,
}

impl VideoFetcher {
    pub fn new(
        store: Arc<dyn VideoStore>,
        client: Arc<YouTubeClient>,
        topics: Vec<String>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            store,
            client,
            topics,
            interval,
        }
    }

    /// Spawn the polling loop. The first cycle runs immediately; afterwards
    /// one cycle per tick. Flipping the watch channel to `true` stops the
    /// loop between ticks; an in-flight cycle finishes first.
    pub fn spawn(self, stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(stop).await })
    }

    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        ensure_metrics_described();
        tracing::info!(
            topics = ?self.topics,
            interval_secs = self.interval.as_secs(),
            "starting video fetcher"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // First tick fires immediately, giving the initial fetch.
                    self.run_cycle().await;
                }
                res = stop.changed() => {
                    // A dropped sender also means shutdown.
                    if res.is_err() || *stop.borrow() {
                        tracing::info!("video fetcher stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Lower bound for this cycle's provider queries.
    pub async fn watermark(&self) -> DateTime<Utc> {
        match self.store.find_one(&Filter::All, SortSpec::Latest).await {
            Ok(Some(latest)) => {
                latest.published_at - Duration::minutes(WATERMARK_SLACK_MINUTES)
            }
            Ok(None) => Utc::now() - Duration::hours(EMPTY_STORE_LOOKBACK_HOURS),
            Err(e) => {
                tracing::warn!(error = ?e, "watermark lookup failed, using lookback window");
                Utc::now() - Duration::hours(EMPTY_STORE_LOOKBACK_HOURS)
            }
        }
    }

    /// One full fetch-and-store cycle across all topics.
    pub async fn run_cycle(&self) -> CycleStats {
        let started = std::time::Instant::now();
        let published_after = self.watermark().await;
        tracing::debug!(%published_after, "fetching videos published after watermark");

        let mut stats = CycleStats::default();

        for topic in &self.topics {
            match self.client.fetch(topic, published_after).await {
                Ok(videos) => {
                    tracing::debug!(topic = %topic, found = videos.len(), "topic fetch done");
                    stats.fetched += videos.len();
                    self.persist_batch(videos, &mut stats).await;
                }
                Err(e) => {
                    // Deliberate partial-failure policy: the remaining topics
                    // still get their chance this cycle.
                    tracing::warn!(error = ?e, topic = %topic, "topic fetch failed, skipping");
                    counter!("fetch_topic_errors_total").increment(1);
                }
            }
        }

        let pool_status = self.client.pool().status();
        counter!("fetch_cycles_total").increment(1);
        counter!("videos_stored_total").increment(stats.stored as u64);
        counter!("videos_skipped_total").increment(stats.skipped as u64);
        counter!("videos_errored_total").increment(stats.errors as u64);
        gauge!("fetch_last_run_ts").set(Utc::now().timestamp() as f64);
        gauge!("api_keys_working").set(pool_status.working_keys as f64);

        tracing::info!(
            stored = stats.stored,
            skipped = stats.skipped,
            errors = stats.errors,
            working_keys = pool_status.working_keys,
            total_keys = pool_status.total_keys,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch cycle completed"
        );
        stats
    }

    async fn persist_batch(&self, videos: Vec<crate::models::Video>, stats: &mut CycleStats) {
        for mut video in videos {
            let existing = self
                .store
                .find_one(&Filter::VideoId(video.video_id.clone()), SortSpec::Latest)
                .await;
            match existing {
                Ok(Some(_)) => stats.skipped += 1,
                Ok(None) => {
                    let now = Utc::now();
                    video.created_at = now;
                    video.updated_at = now;
                    let id = video.video_id.clone();
                    match self.store.insert(video).await {
                        Ok(()) => stats.stored += 1,
                        Err(e) => {
                            tracing::warn!(error = ?e, video_id = %id, "failed to store video");
                            stats.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = ?e, video_id = %video.video_id, "existence check failed");
                    stats.errors += 1;
                }
            }
        }
    }
}
