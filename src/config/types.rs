use serde::Deserialize;
use std::time::Duration;

/// Default number of requests allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default per-attempt deadline (milliseconds)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

/// Default number of extra attempts after the first one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Loader behavior configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-connections")]
    pub max_concurrent_connections: usize,

    /// Per-attempt deadline (milliseconds)
    #[serde(rename = "http-timeout-ms")]
    pub http_timeout_ms: u64,

    /// Added to an item's deadline after each timeout (milliseconds)
    ///
    /// Defaults to a fifth of `http_timeout_ms` when unset.
    #[serde(rename = "timeout-increment-ms")]
    pub timeout_increment_ms: Option<u64>,

    /// Extra attempts after the first (total attempts = max_retries + 1)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Permanently lower the concurrency limit by one on every terminal error
    #[serde(rename = "reduce-connections-on-error")]
    pub reduce_connections_on_error: bool,

    /// Log every request and resolution at info level
    pub verbose: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_connections: DEFAULT_MAX_CONCURRENT,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            timeout_increment_ms: None,
            max_retries: DEFAULT_MAX_RETRIES,
            reduce_connections_on_error: false,
            verbose: false,
        }
    }
}

impl LoaderConfig {
    /// Per-attempt deadline as a duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Deadline growth applied after a timeout
    pub fn timeout_increment(&self) -> Duration {
        Duration::from_millis(
            self.timeout_increment_ms
                .unwrap_or(self.http_timeout_ms / 5),
        )
    }

    /// Total attempts allowed per item
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// User agent rotation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAgentConfig {
    /// Replaces the built-in browser user-agent pool when non-empty
    #[serde(default)]
    pub agents: Vec<String>,
}
