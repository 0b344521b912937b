//! Configuration
//!
//! Everything is read from the environment into explicit structs that are
//! then handed to the sink and scheduler.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::DEFAULT_SETTLE_DELAY;

/// InfluxDB bucket (required)
pub const ENV_BUCKET: &str = "INFLUXDB_BUCKET";
/// InfluxDB organisation (required)
pub const ENV_ORG: &str = "INFLUXDB_ORG";
/// InfluxDB API token (required)
pub const ENV_TOKEN: &str = "INFLUXDB_TOKEN";
/// InfluxDB base URL, e.g. `http://localhost:8086` (required)
pub const ENV_URL: &str = "INFLUXDB_URL";
/// `location` tag value
pub const ENV_LOCATION: &str = "PROJMON_LOCATION";
/// Exhibit name in the boot announcement
pub const ENV_EXHIBIT: &str = "PROJMON_EXHIBIT";
/// Sink queue capacity in points
pub const ENV_QUEUE: &str = "PROJMON_SINK_QUEUE";
/// Number of sink workers
pub const ENV_WORKERS: &str = "PROJMON_SINK_WORKERS";
/// Idle time between sweeps, in seconds
pub const ENV_IDLE_SECS: &str = "PROJMON_IDLE_SECS";
/// Settle delay after each command, in milliseconds
pub const ENV_SETTLE_MS: &str = "PROJMON_SETTLE_MS";
/// Pause after each query, in milliseconds
pub const ENV_QUERY_DELAY_MS: &str = "PROJMON_QUERY_DELAY_MS";

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is set but cannot be used
    #[error("Invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// What is wrong with its value
        reason: String,
    },
}

/// Connection to the InfluxDB instance plus the tags stamped on every point
#[derive(Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Base URL of the InfluxDB server
    pub url: String,
    /// Organisation that owns `bucket`
    pub org: String,
    /// Bucket points are written to
    pub bucket: String,
    /// API token with write access to `bucket`
    pub token: String,
    /// Value of the `location` tag
    pub location: String,
    /// Field value of the boot announcement
    pub exhibit_name: String,
    /// Points that may wait for delivery before new ones are dropped
    pub queue_capacity: usize,
    /// Size of the delivery worker pool
    pub workers: usize,
    /// Timeout of a single write request
    pub request_timeout: Duration,
    /// How long shutdown waits for queued points
    pub drain_timeout: Duration,
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("token", &"<redacted>")
            .field("location", &self.location)
            .field("exhibit_name", &self.exhibit_name)
            .field("queue_capacity", &self.queue_capacity)
            .field("workers", &self.workers)
            .field("request_timeout", &self.request_timeout)
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}

impl SinkConfig {
    /// Default `location` tag
    pub const DEFAULT_LOCATION: &'static str = "Animate";
    /// Default exhibit name
    pub const DEFAULT_EXHIBIT: &'static str = "olaf";
    /// Default queue capacity
    pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
    /// Default worker count
    pub const DEFAULT_WORKERS: usize = 2;

    /// Read from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let config = Self {
            url: required(ENV_URL)?,
            org: required(ENV_ORG)?,
            bucket: required(ENV_BUCKET)?,
            token: required(ENV_TOKEN)?,
            location: lookup(ENV_LOCATION).unwrap_or_else(|| Self::DEFAULT_LOCATION.to_string()),
            exhibit_name: lookup(ENV_EXHIBIT).unwrap_or_else(|| Self::DEFAULT_EXHIBIT.to_string()),
            queue_capacity: parse_var(&lookup, ENV_QUEUE)?
                .unwrap_or(Self::DEFAULT_QUEUE_CAPACITY),
            workers: parse_var(&lookup, ENV_WORKERS)?.unwrap_or(Self::DEFAULT_WORKERS),
            request_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(15),
        };

        if config.queue_capacity == 0 {
            return Err(ConfigError::InvalidVar {
                name: ENV_QUEUE,
                reason: "must be at least 1".into(),
            });
        }
        if config.workers == 0 {
            return Err(ConfigError::InvalidVar {
                name: ENV_WORKERS,
                reason: "must be at least 1".into(),
            });
        }

        Ok(config)
    }
}

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait after writing a command before reading the reply
    pub settle_delay: Duration,
    /// Pause after each query
    pub query_delay: Duration,
    /// Pause after a full sweep of all projectors
    pub idle_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            query_delay: Duration::from_secs(1),
            idle_delay: Duration::from_secs(600),
        }
    }
}

impl PollConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            settle_delay: parse_var(&lookup, ENV_SETTLE_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            query_delay: parse_var(&lookup, ENV_QUERY_DELAY_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.query_delay),
            idle_delay: parse_var(&lookup, ENV_IDLE_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_delay),
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVar {
                name,
                reason: format!("'{raw}': {e}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const SINK_VARS: [(&str, &str); 4] = [
        (ENV_URL, "http://influx:8086"),
        (ENV_ORG, "museum"),
        (ENV_BUCKET, "exhibits"),
        (ENV_TOKEN, "secret"),
    ];

    #[test]
    fn test_sink_config_defaults() {
        let config = SinkConfig::from_lookup(env(&SINK_VARS)).unwrap();
        assert_eq!(config.url, "http://influx:8086");
        assert_eq!(config.location, "Animate");
        assert_eq!(config.exhibit_name, "olaf");
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_missing_sink_var_is_fatal() {
        for missing in [ENV_URL, ENV_ORG, ENV_BUCKET, ENV_TOKEN] {
            let vars: Vec<(&str, &str)> = SINK_VARS
                .iter()
                .copied()
                .filter(|(k, _)| *k != missing)
                .collect();
            assert_eq!(
                SinkConfig::from_lookup(env(&vars)).unwrap_err(),
                ConfigError::MissingVar(missing)
            );
        }
    }

    #[test]
    fn test_blank_sink_var_counts_as_missing() {
        let mut vars = SINK_VARS.to_vec();
        vars[3] = (ENV_TOKEN, "  ");
        assert_eq!(
            SinkConfig::from_lookup(env(&vars)).unwrap_err(),
            ConfigError::MissingVar(ENV_TOKEN)
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut vars = SINK_VARS.to_vec();
        vars.push((ENV_WORKERS, "0"));
        assert!(matches!(
            SinkConfig::from_lookup(env(&vars)),
            Err(ConfigError::InvalidVar { name: ENV_WORKERS, .. })
        ));
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = SinkConfig::from_lookup(env(&SINK_VARS)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_poll_config_overrides() {
        let config = PollConfig::from_lookup(env(&[
            (ENV_IDLE_SECS, "30"),
            (ENV_SETTLE_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(config.idle_delay, Duration::from_secs(30));
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!(config.query_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_poll_config_rejects_garbage() {
        let err = PollConfig::from_lookup(env(&[(ENV_IDLE_SECS, "ten")])).unwrap_err();
        assert!(err.to_string().contains(ENV_IDLE_SECS));
    }
}
