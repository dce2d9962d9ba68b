//! Runtime configuration for the station feed.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

use crate::jcdecaux::{DEFAULT_STATIONS_URL, JcDecauxConfig};
use crate::provider::PollConfig;

/// Default freshness threshold for the local snapshot: 24 hours.
const DEFAULT_CACHE_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Default location of the local snapshot store.
const DEFAULT_CACHE_PATH: &str = "stations_cache.json";

/// An environment variable holds a value that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Configuration for the providers wired up by the binary.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Full URL of the remote stations endpoint.
    pub stations_url: String,

    /// JCDecaux API key, if the endpoint needs one.
    pub api_key: Option<String>,

    /// Remote polling schedule.
    pub poll: PollConfig,

    /// Path of the local snapshot store.
    pub cache_path: PathBuf,

    /// Maximum age of a usable local snapshot.
    pub cache_max_age: TimeDelta,
}

impl FeedConfig {
    /// Read configuration from the process environment.
    ///
    /// Recognised variables: `STATIONS_URL`, `JCDECAUX_API_KEY`,
    /// `POLL_INTERVAL_SECS`, `POLL_REPEAT`, `CACHE_PATH`, `CACHE_MAX_AGE_SECS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("STATIONS_URL") {
            config.stations_url = url;
        }
        config.api_key = lookup("JCDECAUX_API_KEY").filter(|k| !k.is_empty());

        if let Some(value) = lookup("POLL_INTERVAL_SECS") {
            let secs = parse_secs("POLL_INTERVAL_SECS", &value)?;
            if secs == 0 {
                return Err(ConfigError {
                    var: "POLL_INTERVAL_SECS",
                    value,
                    reason: "must be greater than zero",
                });
            }
            config.poll.interval = Duration::from_secs(secs);
        }

        if let Some(value) = lookup("POLL_REPEAT") {
            config.poll.repeat = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError {
                        var: "POLL_REPEAT",
                        value,
                        reason: "expected true or false",
                    });
                }
            };
        }

        if let Some(path) = lookup("CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }

        if let Some(value) = lookup("CACHE_MAX_AGE_SECS") {
            let secs = parse_secs("CACHE_MAX_AGE_SECS", &value)?;
            config.cache_max_age = i64::try_from(secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .ok_or(ConfigError {
                    var: "CACHE_MAX_AGE_SECS",
                    value,
                    reason: "out of range",
                })?;
        }

        Ok(config)
    }

    /// Client configuration for the remote endpoint.
    pub fn jcdecaux(&self) -> JcDecauxConfig {
        let config = JcDecauxConfig::new(&self.stations_url);
        match &self.api_key {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        var,
        value: value.to_string(),
        reason: "expected a whole number of seconds",
    })
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            stations_url: DEFAULT_STATIONS_URL.to_string(),
            api_key: None,
            poll: PollConfig::default(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            cache_max_age: TimeDelta::seconds(DEFAULT_CACHE_MAX_AGE_SECS),
        }
    }
}
