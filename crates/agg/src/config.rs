//! Client configuration: service endpoint and per-call timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AggError, Result};

pub const DEFAULT_ENDPOINT: &str = "localhost:50052";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

pub const ENV_ENDPOINT: &str = "AGGREGATOR_ENDPOINT";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "AGGREGATOR_CONNECT_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "AGGREGATOR_REQUEST_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port`, optionally prefixed with `http://` or `https://`.
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    /// Upper bound for one request/response exchange. Aggregate proof
    /// generation is slow, hence the generous default.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Default::default() }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(s).map_err(|e| AggError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `AGGREGATOR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(ms) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout_ms = parse_ms(ENV_CONNECT_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms = parse_ms(ENV_REQUEST_TIMEOUT_MS, &ms)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let authority = strip_scheme(self.endpoint.trim());
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| AggError::Config(format!("endpoint `{}` is not host:port", self.endpoint)))?;
        if host.is_empty() {
            return Err(AggError::Config(format!("endpoint `{}` has no host", self.endpoint)));
        }
        port.parse::<u16>()
            .map_err(|_| AggError::Config(format!("endpoint `{}` has an invalid port", self.endpoint)))?;
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(AggError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Endpoint as a URI; plain `host:port` is taken as cleartext http.
    pub fn uri(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        }
    }

    pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }
}

fn strip_scheme(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .unwrap_or(endpoint)
}

fn parse_ms(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| AggError::Config(format!("{} must be milliseconds, got `{}`", key, value)))
}
