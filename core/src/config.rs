//! Client configuration.

use std::time::Duration;

use crate::uri;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9200";

/// Bulk responses for large batches run well past the usual 10 MiB caps.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 15 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and port. Trailing slashes are stripped.
    pub base_url: String,
    /// Default timeout for every request; `Params::timeout` overrides it.
    pub timeout: Option<Duration>,
    /// Upper bound on a response body the transport will read.
    pub max_response_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: uri::normalize_base(base_url),
            timeout: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Read `ELASTICSEARCH_URL`, `ELASTICSEARCH_TIMEOUT_MS` and
    /// `ELASTICSEARCH_MAX_RESPONSE_BYTES`; unset variables keep the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("ELASTICSEARCH_URL") {
            Some(url) => Self::new(&url),
            None => Self::default(),
        };
        if let Some(ms) = number(&lookup, "ELASTICSEARCH_TIMEOUT_MS")? {
            config.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(limit) = number(&lookup, "ELASTICSEARCH_MAX_RESPONSE_BYTES")? {
            config.max_response_bytes = limit;
        }
        Ok(config)
    }
}

fn number(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ELASTICSEARCH_URL", "http://es:9200/"),
            ("ELASTICSEARCH_TIMEOUT_MS", "1500"),
            ("ELASTICSEARCH_MAX_RESPONSE_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://es:9200");
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.max_response_bytes, 1024);
    }

    #[test]
    fn bad_number_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("ELASTICSEARCH_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "ELASTICSEARCH_TIMEOUT_MS", .. }));
    }
}
