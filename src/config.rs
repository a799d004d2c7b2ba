// src/config.rs
//
// Environment-driven configuration. Topics can also come from a file
// (TOML or JSON) so deployments can manage the list without rebuilding env.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_TOPICS_PATH: &str = "TOPICS_PATH";
const DEFAULT_TOPICS: &str = "cricket,football,technology,music,gaming";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub youtube: YouTubeConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_keys: Vec<String>,
    pub search_queries: Vec<String>,
    pub fetch_interval_secs: u64,
    pub max_results_per_query: u32,
    pub region_code: String,
    pub relevance_language: String,
}

impl AppConfig {
    /// Load from the process environment (after `dotenvy::dotenv()` in main).
    pub fn from_env() -> Result<Self> {
        let api_keys = split_csv(&env_or("YOUTUBE_API_KEYS", ""));
        if api_keys.is_empty() {
            return Err(anyhow!(
                "YOUTUBE_API_KEYS must contain at least one API key"
            ));
        }

        let search_queries = match std::env::var("YOUTUBE_SEARCH_QUERIES") {
            Ok(csv) if !csv.trim().is_empty() => split_csv(&csv),
            _ => load_topics_default()?,
        };

        Ok(Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse_or("PORT", 8080),
            },
            youtube: YouTubeConfig {
                api_keys,
                search_queries,
                fetch_interval_secs: env_parse_or("FETCH_INTERVAL", 10),
                max_results_per_query: env_parse_or("MAX_RESULTS_PER_QUERY", 50),
                region_code: env_or("REGION_CODE", "IN"),
                relevance_language: env_or("RELEVANCE_LANGUAGE", "en"),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_csv(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(str::to_string).collect())
}

/// Load topics from an explicit path. Supports TOML or JSON formats.
pub fn load_topics_from(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading topics from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_topics(&content, ext.as_str())
}

/// Load topics using env var + fallbacks:
/// 1) $TOPICS_PATH
/// 2) config/topics.toml
/// 3) config/topics.json
/// 4) built-in default list
pub fn load_topics_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_TOPICS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_topics_from(&pb);
        } else {
            return Err(anyhow!("TOPICS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/topics.toml");
    if toml_p.exists() {
        return load_topics_from(&toml_p);
    }
    let json_p = PathBuf::from("config/topics.json");
    if json_p.exists() {
        return load_topics_from(&json_p);
    }
    Ok(split_csv(DEFAULT_TOPICS))
}

fn parse_topics(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("topics");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported topics format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlTopics {
        topics: Vec<String>,
    }
    let v: TomlTopics = toml::from_str(s)?;
    Ok(clean_list(v.topics))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks, and dedup while keeping first-seen order; topic order
/// decides fetch order within a cycle.
fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}
