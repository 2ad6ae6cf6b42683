use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// HTTP settings for [`crate::Api`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme and host of the Bot API, without a trailing slash
    pub base_url: String,

    /// Budget for a single request; the long-poll window is added on top
    pub request_timeout: Duration,

    /// Sent as `timeout` with `getUpdates`; `None` asks for short polling
    pub long_poll_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            long_poll_timeout: Some(Duration::from_secs(25)),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_long_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Total client timeout covering the long-poll window
    pub(crate) fn total_timeout(&self) -> Duration {
        self.request_timeout + self.long_poll_timeout.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_poll_window_extends_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.total_timeout(), Duration::from_secs(55));

        let short = config.with_long_poll_timeout(None);
        assert_eq!(short.total_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:8081/");
        assert_eq!(config.base_url, "http://127.0.0.1:8081");
    }
}
