//! Connection configuration.

use std::time::Duration;

use crate::error::ApiError;

/// Root URL of the remote service.
pub const DEFAULT_API_URL: &str = "https://api.hubapi.com";

/// Automatic retries for connection-level failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Settings fixed for the lifetime of a `PortalConnection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base URL that request paths are appended to.
    pub base_url: String,

    /// `User-Agent` header value sent with every request.
    pub user_agent: String,

    /// How many times a request is re-sent after a connection failure.
    pub max_retries: u32,

    /// Upper bound for a whole request/response exchange.
    pub timeout: Duration,

    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_agent: format!("portal-connection/{}", env!("CARGO_PKG_VERSION")),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `PORTAL_API_URL`, `PORTAL_MAX_RETRIES` and
    /// `PORTAL_TIMEOUT_SECS` when they are set.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(url) = lookup("PORTAL_API_URL") {
            config = config.base_url(url);
        }
        if let Some(raw) = lookup("PORTAL_MAX_RETRIES") {
            config.max_retries = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("PORTAL_MAX_RETRIES must be an integer, got {raw:?}")))?;
        }
        if let Some(raw) = lookup("PORTAL_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("PORTAL_TIMEOUT_SECS must be an integer, got {raw:?}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Set the base URL. A trailing slash is dropped so paths can start
    /// with `/`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
