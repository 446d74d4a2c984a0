//! JSON configuration for the CHORDS client.
//!
//! The file must contain at least the host and one authentication method:
//!
//! ```json
//! { "chords_host": "chords_host.com", "skey": "key" }
//! ```
//!
//! Unknown keys are ignored, so one file can also carry settings for the
//! tools that produce measurements.

use std::{fs, io, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    measurement::Credentials,
    sender::{BackoffPolicy, RetryPolicy, SenderConfig},
};

/// Default queue bound used by the reference collection scripts.
pub const DEFAULT_MAX_QUEUE: usize = 20;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero",
                $field
            )));
        }
    }};
}

/// Settings read from the client configuration file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ChordsConfig {
    pub chords_host: String,
    #[serde(default)]
    pub skey: Option<String>,
    #[serde(default)]
    pub api_email: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_max_queue() -> usize {
    DEFAULT_MAX_QUEUE
}

fn default_poll_interval_ms() -> u64 {
    crate::sender::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_rate_limit_delay_ms() -> u64 {
    crate::sender::DEFAULT_RATE_LIMIT_DELAY.as_millis() as u64
}

fn default_connect_timeout_ms() -> u64 {
    crate::sender::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_request_timeout_ms() -> u64 {
    crate::sender::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

impl ChordsConfig {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chords_host.trim().is_empty() {
            return Err(ConfigError::Invalid("chords_host must not be empty".into()));
        }
        if !self.credentials().is_usable() {
            return Err(ConfigError::Invalid(
                "either skey or both api_email and api_key must be set".into(),
            ));
        }
        ensure_positive!(self.poll_interval_ms, "poll_interval_ms");
        ensure_positive!(self.connect_timeout_ms, "connect_timeout_ms");
        ensure_positive!(self.request_timeout_ms, "request_timeout_ms");
        if let Some(max) = self.max_attempts {
            ensure_positive!(max, "max_attempts");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_email: self.api_email.clone(),
            api_key: self.api_key.clone(),
            skey: self.skey.clone(),
        }
    }

    /// Sender settings derived from this configuration.
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            backoff: BackoffPolicy::Constant {
                delay: Duration::from_millis(self.retry_delay_ms),
                rate_limited_delay: Duration::from_millis(self.rate_limit_delay_ms),
            },
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
            },
            dead_letter: None,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Auth;
    use rstest::rstest;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ChordsConfig::from_json(r#"{"chords_host": "chords_host.com", "skey": "key"}"#)
            .expect("valid config");
        assert_eq!(config.max_queue, DEFAULT_MAX_QUEUE);
        assert_eq!(config.credentials().method(), Auth::Skey("key"));

        let sender = config.sender_config();
        assert_eq!(sender.poll_interval, Duration::from_secs(1));
        assert_eq!(sender.backoff, BackoffPolicy::default());
        assert_eq!(sender.retry, RetryPolicy::unlimited());
    }

    #[test]
    fn ignores_unrelated_keys() {
        let config = ChordsConfig::from_json(
            r#"{"chords_host": "h", "api_email": "a@b.org", "api_key": "k",
                "wxflow": {"port": 50222}, "max_attempts": 5}"#,
        )
        .expect("valid config");
        assert!(matches!(config.credentials().method(), Auth::EmailKey { .. }));
        assert_eq!(config.sender_config().retry, RetryPolicy::capped(5));
    }

    #[rstest]
    #[case(r#"{"skey": "key"}"#)]
    #[case(r#"{"chords_host": 7, "skey": "key"}"#)]
    #[case("not json")]
    fn reports_parse_errors(#[case] json: &str) {
        assert!(matches!(
            ChordsConfig::from_json(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[rstest]
    #[case(r#"{"chords_host": "", "skey": "key"}"#)]
    #[case(r#"{"chords_host": "h"}"#)]
    #[case(r#"{"chords_host": "h", "skey": ""}"#)]
    #[case(r#"{"chords_host": "h", "api_email": "a@b.org"}"#)]
    #[case(r#"{"chords_host": "h", "skey": "k", "poll_interval_ms": 0}"#)]
    #[case(r#"{"chords_host": "h", "skey": "k", "max_attempts": 0}"#)]
    fn rejects_invalid_settings(#[case] json: &str) {
        assert!(matches!(
            ChordsConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ChordsConfig::load("/nonexistent/tochords.json").expect_err("no file");
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/tochords.json"));
    }
}
