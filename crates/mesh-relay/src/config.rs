//! Relay configuration.
//!
//! Loaded once at startup; the relay never reconfigures at runtime.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Configuration for a relay node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Hop count at which a message is delivered but no longer forwarded.
    pub max_hops: u32,
    /// How long a fingerprint is remembered, in milliseconds.
    pub retention_window_ms: u64,
    /// Fingerprint count at which the cache sweeps expired records early.
    ///
    /// Soft limit: live fingerprints are kept even past it.
    pub max_seen_cache: usize,
    /// Interval between background eviction sweeps, in milliseconds.
    pub cleanup_interval_ms: u64,
    /// Capacity of the node's inbound event queue.
    pub event_buffer: usize,
    /// Payloads larger than this are dropped unread.
    pub max_payload_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            retention_window_ms: 60_000,
            max_seen_cache: 10_000,
            cleanup_interval_ms: 5_000,
            event_buffer: 256,
            max_payload_bytes: 64 * 1024,
        }
    }
}

impl RelayConfig {
    /// Creates a config tuned for a handful of devices in radio range.
    #[must_use]
    pub fn small_mesh() -> Self {
        Self {
            max_hops: 3,
            max_seen_cache: 1_000,
            ..Self::default()
        }
    }

    /// Sets the maximum hop count.
    #[must_use]
    pub const fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Sets the retention window.
    #[must_use]
    pub const fn with_retention_window(mut self, window: Duration) -> Self {
        self.retention_window_ms = window.as_millis() as u64;
        self
    }

    /// Sets the seen-cache capacity.
    #[must_use]
    pub const fn with_max_seen_cache(mut self, max: usize) -> Self {
        self.max_seen_cache = max;
        self
    }

    /// Sets the background eviction interval.
    #[must_use]
    pub const fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Returns the retention window.
    #[must_use]
    pub const fn retention_window(&self) -> Duration {
        Duration::from_millis(self.retention_window_ms)
    }

    /// Returns the background eviction interval.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, RelayError> {
        let config: Self =
            toml::from_str(content).map_err(|e| RelayError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, RelayError> {
        toml::to_string_pretty(self).map_err(|e| RelayError::Config(format!("serialize: {e}")))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_hops == 0 {
            return Err(RelayError::Config("max_hops must be positive".to_string()));
        }
        if self.retention_window_ms == 0 {
            return Err(RelayError::Config(
                "retention_window_ms must be positive".to_string(),
            ));
        }
        if self.max_seen_cache == 0 {
            return Err(RelayError::Config(
                "max_seen_cache must be positive".to_string(),
            ));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(RelayError::Config(
                "cleanup_interval_ms must be positive".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(RelayError::Config("event_buffer must be positive".to_string()));
        }
        if self.max_payload_bytes == 0 {
            return Err(RelayError::Config(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
