//! tubefeed — Binary Entrypoint
//! Boots the background video fetcher and the Axum HTTP server, wiring
//! routes, shared state, and the Prometheus exporter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tubefeed::api::{create_router, AppState};
use tubefeed::config::AppConfig;
use tubefeed::fetcher::VideoFetcher;
use tubefeed::keypool::ApiKeyPool;
use tubefeed::metrics::Metrics;
use tubefeed::store::{memory::MemoryStore, VideoStore};
use tubefeed::youtube::{HttpBackend, YouTubeClient};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env().context("loading configuration")?;
    let metrics = Metrics::init(cfg.youtube.fetch_interval_secs);

    let pool = Arc::new(ApiKeyPool::new(cfg.youtube.api_keys.clone())?);
    let client = Arc::new(YouTubeClient::new(
        Arc::new(HttpBackend::new()),
        Arc::clone(&pool),
        cfg.youtube.max_results_per_query,
        cfg.youtube.region_code.clone(),
        cfg.youtube.relevance_language.clone(),
    ));
    let store: Arc<dyn VideoStore> = Arc::new(MemoryStore::new());

    // Background polling loop; flipping the watch channel stops it between
    // ticks, letting an in-flight cycle finish.
    let (stop_tx, stop_rx) = watch::channel(false);
    let fetcher = VideoFetcher::new(
        Arc::clone(&store),
        Arc::clone(&client),
        cfg.youtube.search_queries.clone(),
        Duration::from_secs(cfg.youtube.fetch_interval_secs),
    );
    let fetcher_handle = fetcher.spawn(stop_rx);

    let state = AppState {
        store,
        client,
        pool,
    };
    let router = create_router(state).merge(metrics.router());

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("serving HTTP")?;

    let _ = stop_tx.send(true);
    let _ = fetcher_handle.await;
    tracing::info!("server exited");
    Ok(())
}
