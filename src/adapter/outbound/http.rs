//! HTTP client settings shared by the toncenter and relay adapters.

use std::fmt::Display;
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::warn;

/// Timeouts and retry policy for outbound HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum number of attempts for transient failures.
    #[serde(default = "default_http_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Backoff between retries in milliseconds.
    #[serde(default = "default_http_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_http_timeout_ms() -> u64 {
    10_000
}

const fn default_http_connect_timeout_ms() -> u64 {
    3_000
}

const fn default_http_retry_max_attempts() -> u32 {
    3
}

const fn default_http_retry_backoff_ms() -> u64 {
    1_000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            retry_max_attempts: default_http_retry_max_attempts(),
            retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}

impl HttpConfig {
    /// Build a client honoring the configured timeouts.
    #[must_use]
    pub fn build_client(&self) -> HttpClient {
        HttpClient::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            })
    }

    pub(crate) fn max_attempts(&self) -> u32 {
        self.retry_max_attempts.max(1)
    }

    pub(crate) async fn backoff(&self, attempt: u32, reason: &(dyn Display + Sync)) {
        warn!(
            attempt,
            max_attempts = self.max_attempts(),
            error = %reason,
            "HTTP request failed, retrying"
        );
        if self.retry_backoff_ms > 0 {
            sleep(Duration::from_millis(self.retry_backoff_ms)).await;
        }
    }
}

/// Errors worth retrying: the request likely never reached the server.
pub(crate) fn should_retry(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Statuses worth retrying: upstream overload or outage.
pub(crate) fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_retries() {
        let config = HttpConfig::default();
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.timeout_ms, 10_000);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = HttpConfig {
            retry_max_attempts: 0,
            ..HttpConfig::default()
        };
        assert_eq!(config.max_attempts(), 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn backoff_future_is_send() {
        let config = HttpConfig::default();
        let status = StatusCode::BAD_GATEWAY;
        let backoff = config.backoff(1, &status);
        assert_send(&backoff);
    }

    #[test]
    fn retryable_statuses() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_status(StatusCode::BAD_REQUEST));
        assert!(!should_retry_status(StatusCode::UNAUTHORIZED));
    }
}
