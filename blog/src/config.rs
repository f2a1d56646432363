//! Configuration for the posts feature.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The binary loads a `.env` file into the environment first, if one exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The service base URL does not parse
    #[error("Invalid service base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected value
        url: String,
        /// Parser message
        reason: String,
    },

    /// Unknown missing-target policy name
    #[error("Unknown missing-target policy {0:?} (expected ignore, warn or record)")]
    UnknownPolicy(String),

    /// A value that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// What to do when an update or delete succeeds for an id that is not in the
/// collection.
///
/// The collection is left unchanged in every case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTargetPolicy {
    /// Do nothing
    #[default]
    Ignore,
    /// Log a warning
    Warn,
    /// Log a warning and keep an [`UnmatchedMutation`](crate::state::UnmatchedMutation) in state
    Record,
}

impl FromStr for MissingTargetPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "record" => Ok(Self::Record),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Posts feature configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsConfig {
    /// Base URL of the remote collection service
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub api_timeout_secs: u64,
    /// Handling of update/delete results without a target
    pub missing_target_policy: MissingTargetPolicy,
    /// Capacity of the lifecycle event broadcast channel
    pub broadcast_capacity: usize,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000/".to_string(),
            api_timeout_secs: 10,
            missing_target_policy: MissingTargetPolicy::Ignore,
            broadcast_capacity: 64,
            shutdown_timeout_secs: 5,
        }
    }
}

impl PostsConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_base_url: env::var("POSTS_API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_timeout_secs: env::var("POSTS_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.api_timeout_secs),
            missing_target_policy: env::var("POSTS_MISSING_TARGET_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.missing_target_policy),
            broadcast_capacity: env::var("POSTS_BROADCAST_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.broadcast_capacity),
            shutdown_timeout_secs: env::var("POSTS_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_secs),
        }
    }

    /// Check values that would only fail later.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a base URL that does not parse or a zero
    /// timeout or capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.api_base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;

        if self.api_timeout_secs == 0 {
            return Err(ConfigError::Zero("POSTS_API_TIMEOUT_SECS"));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Zero("POSTS_BROADCAST_CAPACITY"));
        }
        Ok(())
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Runtime settings derived from this configuration.
    #[must_use]
    pub const fn store_config(&self) -> postsync_runtime::StoreConfig {
        postsync_runtime::StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout())
    }
}
