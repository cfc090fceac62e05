use crate::errors::{QuoteBoardError, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_ENDPOINT_PATH: &str = "/stocks/nasdaq100-quotes";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub endpoint_path: String,
    pub request_timeout: Option<Duration>, // None = 不设超时
    pub poll_interval: Option<Duration>,   // None = 只在挂载时加载一次
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            request_timeout: None,
            poll_interval: None,
        }
    }

    /// Build a config from `QUOTE_BOARD_*` environment variables, reading `.env` first.
    ///
    /// Unset variables keep their defaults. A numeric variable that does not parse is
    /// reported instead of silently ignored.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(url) = lookup("QUOTE_BOARD_BASE_URL") {
            config = config.with_base_url(&url);
        }
        if let Some(path) = lookup("QUOTE_BOARD_ENDPOINT_PATH") {
            config = config.with_endpoint_path(&path);
        }
        if let Some(secs) = lookup("QUOTE_BOARD_TIMEOUT_SECS") {
            config = config.with_request_timeout(Some(parse_secs("QUOTE_BOARD_TIMEOUT_SECS", &secs)?));
        }
        if let Some(secs) = lookup("QUOTE_BOARD_POLL_SECS") {
            config = config.with_poll_interval(Some(parse_secs("QUOTE_BOARD_POLL_SECS", &secs)?));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_endpoint_path(mut self, path: &str) -> Self {
        self.endpoint_path = path.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Full URL of the quote snapshot endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_path.trim_start_matches('/')
        )
    }
}

/// Parse a positive number of seconds, fractions allowed.
pub fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    let secs = value
        .trim()
        .parse::<f64>()
        .map_err(|e| QuoteBoardError::ConfigError(format!("{}={:?}: {}", name, value, e)))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(QuoteBoardError::ConfigError(format!(
            "{}={:?}: must be a positive number of seconds",
            name, value
        )));
    }

    Duration::try_from_secs_f64(secs).map_err(|e| {
        QuoteBoardError::ConfigError(format!("{}={:?}: {}", name, value, e))
    })
}

/// Parse a cards-per-row count; zero is rejected.
pub fn parse_columns(name: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(columns) if columns > 0 => Ok(columns),
        Ok(_) => Err(QuoteBoardError::ConfigError(format!(
            "{}={:?}: must be at least 1",
            name, value
        ))),
        Err(e) => Err(QuoteBoardError::ConfigError(format!("{}={:?}: {}", name, value, e))),
    }
}
