//! Client configuration loaded from `GAVEL_*` environment variables.
//!
//! Unset variables fall back to a local development backend.

use std::time::Duration;

use gavel_net::LiveConfig;
use gavel_shared::constants::{
    DEFAULT_API_URL, DEFAULT_ECHO_CAPACITY, DEFAULT_HEARTBEAT_MS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_INBOX_CAPACITY, DEFAULT_PAGE_SIZE, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_WS_URL,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base URL.
    /// Env: `GAVEL_API_URL`
    /// Default: `http://localhost:8080/api`
    pub api_url: String,

    /// STOMP-over-WebSocket endpoint.
    /// Env: `GAVEL_WS_URL`
    /// Default: `ws://localhost:8080/ws`
    pub ws_url: String,

    /// Delay before a dropped live connection is reopened.
    /// Env: `GAVEL_RECONNECT_DELAY_MS`
    /// Default: `5000`
    pub reconnect_delay: Duration,

    /// Heartbeat interval offered in both directions.
    /// Env: `GAVEL_HEARTBEAT_MS`
    /// Default: `4000`
    pub heartbeat: Duration,

    /// Capacity of each view's event inbox.
    /// Env: `GAVEL_INBOX_CAPACITY`
    /// Default: `256`
    pub inbox_capacity: usize,

    /// How many locally written ids a view remembers for echo suppression.
    /// Env: `GAVEL_ECHO_CAPACITY`
    /// Default: `1024`
    pub echo_capacity: usize,

    /// REST request timeout.
    /// Env: `GAVEL_HTTP_TIMEOUT_SECS`
    /// Default: `15`
    pub http_timeout: Duration,

    /// Page size used for the initial comment fetch.
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            heartbeat: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            echo_capacity: DEFAULT_ECHO_CAPACITY,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("GAVEL_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = lookup("GAVEL_WS_URL") {
            config.ws_url = url;
        }

        if let Some(ms) = parse_number::<u64>(&lookup, "GAVEL_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_number::<u64>(&lookup, "GAVEL_HEARTBEAT_MS") {
            config.heartbeat = Duration::from_millis(ms);
        }

        if let Some(n) = parse_number::<usize>(&lookup, "GAVEL_INBOX_CAPACITY") {
            if n > 0 {
                config.inbox_capacity = n;
            }
        }

        if let Some(n) = parse_number::<usize>(&lookup, "GAVEL_ECHO_CAPACITY") {
            if n > 0 {
                config.echo_capacity = n;
            }
        }

        if let Some(secs) = parse_number::<u64>(&lookup, "GAVEL_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Transport settings for the live connections.
    pub fn live(&self) -> LiveConfig {
        LiveConfig {
            url: self.ws_url.clone(),
            reconnect_delay: self.reconnect_delay,
            heartbeat: self.heartbeat,
            channel_capacity: self.inbox_capacity,
            ..LiveConfig::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse::<T>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %value, "Invalid number, using default");
            None
        }
    }
}
