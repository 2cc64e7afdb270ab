//! Configuration for the feed client.

use std::time::Duration;

/// The results endpoint path, shared by both transports.
pub const RESULTS_PATH: &str = "/fetch-results";

/// Configuration for a feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the backend (e.g., "https://api.example.com").
    pub base_url: String,
    /// Extra request headers sent on every connection and poll.
    pub headers: Vec<(String, String)>,
    /// Reconnect/backoff configuration for the stream transport.
    pub retry: RetryConfig,
    /// Interval between poll requests once streaming has been abandoned.
    pub poll_interval: Duration,
    /// Maximum silence on the stream before it is declared dead.
    pub stream_heartbeat_timeout: Duration,
    /// Per-request timeout in poll mode.
    pub poll_request_timeout: Duration,
}

impl FeedConfig {
    /// Creates a configuration with default timings for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: Vec::new(),
            retry: RetryConfig::default(),
            poll_interval: Duration::from_millis(30_000),
            stream_heartbeat_timeout: Duration::from_millis(120_000),
            poll_request_timeout: Duration::from_millis(15_000),
        }
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the stream heartbeat timeout.
    pub fn with_stream_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.stream_heartbeat_timeout = timeout;
        self
    }

    /// Sets the per-request poll timeout.
    pub fn with_poll_request_timeout(mut self, timeout: Duration) -> Self {
        self.poll_request_timeout = timeout;
        self
    }

    /// Returns the full results endpoint URL.
    pub fn results_url(&self) -> String {
        format!("{}{}", self.base_url, RESULTS_PATH)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Configuration for stream reconnect behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of reconnect attempts before falling back to polling.
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay on each subsequent attempt.
    pub multiplier: u32,
    /// Optional cap on any single delay. Uncapped by default.
    pub max_delay: Option<Duration>,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(3_000),
            multiplier: 2,
            max_delay: None,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps every delay at the given duration.
    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_config_defaults() {
        let config = FeedConfig::new("https://api.example.com");
        assert_eq!(config.poll_interval, Duration::from_millis(30_000));
        assert_eq!(config.stream_heartbeat_timeout, Duration::from_millis(120_000));
        assert_eq!(config.poll_request_timeout, Duration::from_millis(15_000));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(3_000));
        assert_eq!(config.retry.multiplier, 2);
    }

    #[test]
    fn feed_config_builder() {
        let config = FeedConfig::new("https://api.example.com")
            .with_header("Authorization", "Bearer token")
            .with_poll_interval(Duration::from_secs(10))
            .with_poll_request_timeout(Duration::from_secs(5));

        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.poll_request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn results_url_appends_path() {
        let config = FeedConfig::new("https://api.example.com");
        assert_eq!(config.results_url(), "https://api.example.com/fetch-results");
    }
}
