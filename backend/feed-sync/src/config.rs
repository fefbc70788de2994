/// Configuration for the feed sync engine
///
/// Loads configuration from environment variables.
use anyhow::{ensure, Context, Result};
use feed_schema::limits::{DISCOVERY_MAX_QUERY_TAGS, DISCOVERY_MAX_RESULTS, FEED_WINDOW};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub feed: FeedConfig,
    pub profile: ProfileConfig,
    pub discovery: DiscoveryConfig,
    pub log: LogConfig,
}

/// Feed window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Snapshot page size and subscription limit
    #[serde(default = "default_feed_window")]
    pub page_size: usize,
    /// Local cache cap; older entries are evicted past this
    #[serde(default = "default_feed_window")]
    pub cache_cap: usize,
    /// Deadline for the bulk feed load; `None` waits for the store
    #[serde(default)]
    pub load_timeout: Option<Duration>,
}

/// Profile loading settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_timeout")]
    pub load_timeout: Duration,
}

/// Discovery query bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Tags sent in one any-of query
    #[serde(default = "default_tag_limit")]
    pub tag_limit: usize,
    /// Candidates fetched per query
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive string
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default values
fn default_feed_window() -> usize {
    FEED_WINDOW
}

fn default_profile_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_tag_limit() -> usize {
    DISCOVERY_MAX_QUERY_TAGS
}

fn default_result_limit() -> usize {
    DISCOVERY_MAX_RESULTS
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_feed_window(),
            cache_cap: default_feed_window(),
            load_timeout: None,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            load_timeout: default_profile_timeout(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            tag_limit: default_tag_limit(),
            result_limit: default_result_limit(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// Parse `key` if set; a set-but-malformed value is an error
fn parse_var<T, L>(lookup: &L, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(None),
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let feed = FeedConfig {
            page_size: parse_var(&lookup, "FEED_PAGE_SIZE")?.unwrap_or_else(default_feed_window),
            cache_cap: parse_var(&lookup, "FEED_CACHE_CAP")?.unwrap_or_else(default_feed_window),
            load_timeout: parse_var::<u64, _>(&lookup, "FEED_LOAD_TIMEOUT_MS")?
                .map(Duration::from_millis),
        };

        let profile = ProfileConfig {
            load_timeout: parse_var::<u64, _>(&lookup, "PROFILE_LOAD_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or_else(default_profile_timeout),
        };

        let discovery = DiscoveryConfig {
            tag_limit: parse_var(&lookup, "DISCOVERY_TAG_LIMIT")?.unwrap_or_else(default_tag_limit),
            result_limit: parse_var(&lookup, "DISCOVERY_RESULT_LIMIT")?
                .unwrap_or_else(default_result_limit),
        };

        let log = LogConfig {
            filter: lookup("LOG_FILTER")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(default_log_filter),
            json: parse_var(&lookup, "LOG_JSON")?.unwrap_or(false),
        };

        let config = SyncConfig {
            feed,
            profile,
            discovery,
            log,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.feed.page_size > 0, "FEED_PAGE_SIZE must be positive");
        ensure!(self.feed.cache_cap > 0, "FEED_CACHE_CAP must be positive");
        ensure!(
            (1..=DISCOVERY_MAX_QUERY_TAGS).contains(&self.discovery.tag_limit),
            "DISCOVERY_TAG_LIMIT must be between 1 and {}",
            DISCOVERY_MAX_QUERY_TAGS
        );
        ensure!(
            self.discovery.result_limit > 0,
            "DISCOVERY_RESULT_LIMIT must be positive"
        );
        Ok(())
    }
}
