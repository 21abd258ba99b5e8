//! HTTP client configuration and building logic
//!
//! One `reqwest::Client` is built per run and shared by every worker, so the
//! connection pool is reused across MKCOL and PUT requests.

use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};

use crate::constants::{http, limits, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the shared HTTP client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout, body upload included
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// TCP keep-alive interval
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Idle connections kept per host; sized to the worker count
    pub pool_max_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: workers::DEFAULT_WORKER_COUNT,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    ///
    /// Redirects are never followed: a redirected PUT would be replayed
    /// without a body and a Digest response is bound to the original URI.
    pub fn build_http_client(&self) -> ConfigResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(redirect::Policy::none())
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(ConfigError::HttpClient)
    }
}

/// Retry policy for retryable task failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; zero disables retrying
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::MAX_RETRIES,
            base_delay: limits::RETRY_BASE_DELAY,
            max_delay: limits::RETRY_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Fresh backoff schedule for one task
    ///
    /// The attempt limit is enforced by the caller, so elapsed time is
    /// unbounded here.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Total attempts allowed, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
