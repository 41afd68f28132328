use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration describing how to reach the remote record store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Origin serving `/gameState`, without a trailing slash.
    pub base_url: String,
    /// Upper bound for each GET or PUT.
    pub request_timeout: Duration,
}

impl HttpStoreConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
