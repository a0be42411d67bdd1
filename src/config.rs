//! Polling configuration.
//!
//! Controls the pacing delay between continuation requests and the overall
//! request deadline enforced by the deadline governor.

use crate::error::ArgumentError;
use std::time::Duration;

/// Environment variable overriding [`PollingConfig::check_interval`], in milliseconds.
pub const CHECK_INTERVAL_ENV: &str = "PRESTO_CHECK_INTERVAL_MS";

/// Environment variable overriding [`PollingConfig::client_request_timeout`], in seconds.
pub const CLIENT_REQUEST_TIMEOUT_ENV: &str = "PRESTO_CLIENT_REQUEST_TIMEOUT_SECS";

const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(800);

/// Configuration consumed by the continuation poller and deadline governor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Delay before each continuation request (default: 800ms)
    pub check_interval: Duration,

    /// Budget for time spent waiting on the network. `None` disables the deadline.
    pub client_request_timeout: Option<Duration>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            client_request_timeout: None,
        }
    }
}

impl PollingConfig {
    /// Create a new PollingConfigBuilder.
    pub fn builder() -> PollingConfigBuilder {
        PollingConfigBuilder::new()
    }

    /// Load configuration from the process environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns `ArgumentError::InvalidConfig` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ArgumentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ArgumentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = PollingConfigBuilder::new();

        if let Some(raw) = lookup(CHECK_INTERVAL_ENV) {
            let millis = parse_u64(CHECK_INTERVAL_ENV, &raw)?;
            builder = builder.check_interval(Duration::from_millis(millis));
        }

        if let Some(raw) = lookup(CLIENT_REQUEST_TIMEOUT_ENV) {
            let secs = parse_u64(CLIENT_REQUEST_TIMEOUT_ENV, &raw)?;
            builder = builder.client_request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

/// Builder for [`PollingConfig`].
#[derive(Debug, Default)]
pub struct PollingConfigBuilder {
    check_interval: Option<Duration>,
    client_request_timeout: Option<Duration>,
}

impl PollingConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pacing delay between continuation requests.
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = Some(interval);
        self
    }

    /// Set the network-wait budget.
    pub fn client_request_timeout(mut self, timeout: Duration) -> Self {
        self.client_request_timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    /// Returns `ArgumentError::InvalidConfig` if the request timeout is zero.
    pub fn build(self) -> Result<PollingConfig, ArgumentError> {
        if let Some(timeout) = self.client_request_timeout {
            if timeout.is_zero() {
                return Err(ArgumentError::InvalidConfig {
                    parameter: "client_request_timeout".to_string(),
                    message: "Request timeout must be greater than zero".to_string(),
                });
            }
        }

        Ok(PollingConfig {
            check_interval: self.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL),
            client_request_timeout: self.client_request_timeout,
        })
    }
}

fn parse_u64(parameter: &str, raw: &str) -> Result<u64, ArgumentError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ArgumentError::InvalidConfig {
            parameter: parameter.to_string(),
            message: format!("'{}' is not a non-negative integer: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PollingConfig::default();
        assert_eq!(config.check_interval, Duration::from_millis(800));
        assert!(config.client_request_timeout.is_none());
    }

    #[test]
    fn test_builder_full() {
        let config = PollingConfig::builder()
            .check_interval(Duration::from_millis(50))
            .client_request_timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(config.check_interval, Duration::from_millis(50));
        assert_eq!(config.client_request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = PollingConfig::builder()
            .client_request_timeout(Duration::ZERO)
            .build();

        assert!(matches!(
            result,
            Err(ArgumentError::InvalidConfig { ref parameter, .. }) if parameter == "client_request_timeout"
        ));
    }

    #[test]
    fn test_zero_check_interval_allowed() {
        let config = PollingConfig::builder()
            .check_interval(Duration::ZERO)
            .build()
            .unwrap();
        assert!(config.check_interval.is_zero());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (CHECK_INTERVAL_ENV, "250"),
            (CLIENT_REQUEST_TIMEOUT_ENV, "12"),
        ]
        .into_iter()
        .collect();

        let config = PollingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.check_interval, Duration::from_millis(250));
        assert_eq!(config.client_request_timeout, Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = PollingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, PollingConfig::default());
    }

    #[test]
    fn test_from_lookup_malformed() {
        let result = PollingConfig::from_lookup(|k| {
            (k == CHECK_INTERVAL_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ArgumentError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_lookup_zero_timeout_rejected() {
        let result = PollingConfig::from_lookup(|k| {
            (k == CLIENT_REQUEST_TIMEOUT_ENV).then(|| "0".to_string())
        });
        assert!(result.is_err());
    }
}
