//! Application configuration
//!
//! All tunables are carried by an explicitly constructed `Config` value and
//! passed into constructors; there is no ambient/shared default instance.
//! `Config::from_env` reads environment variables with documented fallbacks.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::client::RetryPolicy;

/// Errors raised when a required setting is absent
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required API key was not provided
    #[error("{0} not set in environment")]
    MissingKey(&'static str),
}

/// Configuration for the optimizer and its support services
#[derive(Debug, Clone)]
pub struct Config {
    /// Key for the text-generation API (`OPENAI_API_KEY`)
    pub openai_api_key: Option<String>,
    /// Key for the scraping proxy (`SCRAPER_API_KEY`)
    pub scraper_api_key: Option<String>,
    /// Generation model name (`GIGOPT_MODEL`, default "gpt-4")
    pub model: String,
    /// Default TTL for cached responses in seconds (`GIGOPT_CACHE_TTL`, default 3600)
    pub cache_ttl_seconds: u64,
    /// Cache capacity bound; oldest entries evicted beyond it
    /// (`GIGOPT_CACHE_MAX_ENTRIES`, default 500)
    pub cache_max_entries: Option<usize>,
    /// Where the cache persists; `None` keeps it memory-only
    /// (`GIGOPT_CACHE_FILE`, default XDG cache dir)
    pub cache_file: Option<PathBuf>,
    /// Where favorites/history persist (`GIGOPT_STATE_FILE`, default XDG data dir)
    pub state_file: PathBuf,
    /// Retry behavior for upstream calls (`GIGOPT_MAX_ATTEMPTS`,
    /// `GIGOPT_BASE_DELAY_MS`, `GIGOPT_MAX_DELAY_MS`; defaults 3/1000/10000,
    /// jitter on)
    pub retry: RetryPolicy,
    /// Per-request timeout (`GIGOPT_TIMEOUT_SECS`, default 30)
    pub request_timeout: Duration,
}

impl Config {
    /// Builds a configuration from environment variables
    ///
    /// Unset or unparseable values fall back to the documented defaults;
    /// API keys stay `None` and are demanded only by the commands that need
    /// them.
    pub fn from_env() -> Self {
        let (default_cache_file, default_state_file) = default_paths();

        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            scraper_api_key: std::env::var("SCRAPER_API_KEY").ok(),
            model: std::env::var("GIGOPT_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            cache_ttl_seconds: env_parse("GIGOPT_CACHE_TTL", 3600),
            cache_max_entries: Some(env_parse("GIGOPT_CACHE_MAX_ENTRIES", 500)),
            cache_file: std::env::var("GIGOPT_CACHE_FILE")
                .map(PathBuf::from)
                .ok()
                .or(default_cache_file),
            state_file: std::env::var("GIGOPT_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(default_state_file),
            retry: RetryPolicy::new(
                env_parse("GIGOPT_MAX_ATTEMPTS", 3),
                env_parse("GIGOPT_BASE_DELAY_MS", 1_000),
                env_parse("GIGOPT_MAX_DELAY_MS", 10_000),
                true,
            ),
            request_timeout: Duration::from_secs(env_parse("GIGOPT_TIMEOUT_SECS", 30)),
        }
    }
}

/// Default cache and state file locations under XDG directories
///
/// Falls back to paths relative to the working directory when no home
/// directory can be determined (e.g. bare CI containers).
fn default_paths() -> (Option<PathBuf>, PathBuf) {
    match ProjectDirs::from("", "", "gigopt") {
        Some(dirs) => (
            Some(dirs.cache_dir().join("responses.json")),
            dirs.data_dir().join("app_state.json"),
        ),
        None => (
            Some(PathBuf::from(".gigopt/responses.json")),
            PathBuf::from(".gigopt/app_state.json"),
        ),
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
