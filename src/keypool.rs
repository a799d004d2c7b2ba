// src/keypool.rs
//
// Rotation policy over the configured YouTube API keys. Any provider-side
// failure marks the active key exhausted; rotation scans forward circularly
// and skips keys whose cool-down has not elapsed yet.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{ensure, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long an exhausted key is skipped before rotation will try it again.
/// YouTube daily quotas reset after ~24h; 23h leaves slack for clock drift.
const COOL_DOWN_HOURS: i64 = 23;

#[derive(Debug)]
struct PoolState {
    current: usize,
    /// key index -> time of the last observed failure
    exhausted: HashMap<usize, DateTime<Utc>>,
}

/// Shared pool of API keys with per-key cool-down tracking.
///
/// All mutation goes through this handle; the fetch path and the status
/// endpoint both borrow it (`Arc<ApiKeyPool>`), so reads share the lock and
/// writes take it exclusively.
#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    state: RwLock<PoolState>,
}

/// Observability snapshot; not authoritative for rotation decisions.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PoolStatus {
    pub total_keys: usize,
    pub working_keys: usize,
    pub exhausted_keys: usize,
    pub current_key_index: usize,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        ensure!(!keys.is_empty(), "at least one YouTube API key is required");
        Ok(Self {
            keys,
            state: RwLock::new(PoolState {
                current: 0,
                exhausted: HashMap::new(),
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Active key and its index. Never fails: the pool is non-empty by
    /// construction and the index always points inside `keys`.
    pub fn current(&self) -> (usize, String) {
        let state = self.state.read().expect("rwlock poisoned");
        (state.current, self.keys[state.current].clone())
    }

    /// Record a failure time for the key at `index`.
    pub fn mark_exhausted(&self, index: usize) {
        let mut state = self.state.write().expect("rwlock poisoned");
        state.exhausted.insert(index, Utc::now());
        tracing::warn!(key_index = index, "API key marked as exhausted");
    }

    /// Advance to the next usable key, scanning forward circularly from the
    /// active index. An entry whose cool-down has elapsed is cleared on the
    /// way. Returns false (index unchanged) only when every key, the active
    /// one included, is still cooling down.
    pub fn rotate(&self) -> bool {
        let mut state = self.state.write().expect("rwlock poisoned");
        let now = Utc::now();
        let n = self.keys.len();
        let start = state.current;

        for step in 1..=n {
            let idx = (start + step) % n;
            if let Some(failed_at) = state.exhausted.get(&idx).copied() {
                if now - failed_at < Duration::hours(COOL_DOWN_HOURS) {
                    tracing::debug!(key_index = idx, "skipping cooling-down API key");
                    continue;
                }
                // Cool-down elapsed; the key is usable again.
                state.exhausted.remove(&idx);
            }
            state.current = idx;
            tracing::info!(key_index = idx, "rotated to API key");
            return true;
        }

        tracing::warn!(total_keys = n, "all API keys are exhausted");
        false
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.state.read().expect("rwlock poisoned");
        let now = Utc::now();
        let cooling = state
            .exhausted
            .values()
            .filter(|t| now - **t < Duration::hours(COOL_DOWN_HOURS))
            .count();
        PoolStatus {
            total_keys: self.keys.len(),
            working_keys: self.keys.len() - cooling,
            exhausted_keys: cooling,
            current_key_index: state.current,
        }
    }

    /// Test hook: backdate a key's failure time so cool-down expiry paths
    /// can be exercised without waiting.
    #[cfg(test)]
    pub(crate) fn set_exhausted_at(&self, index: usize, failed_at: DateTime<Utc>) {
        let mut state = self.state.write().expect("rwlock poisoned");
        state.exhausted.insert(index, failed_at);
    }
}
