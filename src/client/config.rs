//! Upstream connection configuration

use std::time::Duration;

/// Delay between attempts while the upstream host does not resolve
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Upstream connection options
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// WebSocket URL of the event source (`ws://host[:port]/path`)
    pub url: String,

    /// Fixed wait between attempts after a name-resolution failure
    pub retry_delay: Duration,

    /// Cap on resolution retries (None = retry forever)
    pub max_retries: Option<u32>,

    /// Per-attempt limit on connect + handshake (None = no limit)
    pub connect_timeout: Option<Duration>,
}

impl UpstreamConfig {
    /// Create a config for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retries: None,
            connect_timeout: None,
        }
    }

    /// Build `ws://{host}/{endpoint}`
    pub fn from_endpoint(host: &str, endpoint: &str) -> Self {
        let host = host.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        Self::new(format!("ws://{host}/{endpoint}"))
    }

    /// Set the retry delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Give up after this many resolution retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the per-attempt connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
