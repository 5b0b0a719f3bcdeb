//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Time-to-live in seconds for cached weather reports
    pub cache_ttl_secs: u64,
    /// Minimum spacing between outbound fetches, in seconds
    pub rate_limit_interval: f64,
    /// Maximum number of cached reports (0 = unbounded)
    pub max_entries: usize,
    /// Background expiry sweep interval in seconds (0 = disabled)
    pub cleanup_interval: u64,
    /// Timeout for a single outbound HTTP attempt, in seconds
    pub request_timeout: f64,
    /// Number of attempts per outbound fetch
    pub max_retries: u32,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 600)
    /// - `RATE_LIMIT_INTERVAL` - Fetch spacing in seconds (default: 1.0)
    /// - `CACHE_MAX_ENTRIES` - Maximum cached reports (default: 256)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `REQUEST_TIMEOUT` - Per-attempt HTTP timeout in seconds (default: 6.0)
    /// - `MAX_RETRIES` - Attempts per fetch (default: 3)
    /// - `PORT` - HTTP server port (default: 8000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_secs: parse_var("CACHE_TTL_SECONDS").unwrap_or(defaults.cache_ttl_secs),
            rate_limit_interval: parse_var("RATE_LIMIT_INTERVAL")
                .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.rate_limit_interval),
            max_entries: parse_var("CACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            request_timeout: parse_var("REQUEST_TIMEOUT")
                .filter(|v: &f64| v.is_finite() && *v > 0.0)
                .unwrap_or(defaults.request_timeout),
            max_retries: parse_var("MAX_RETRIES")
                .filter(|v: &u32| *v > 0)
                .unwrap_or(defaults.max_retries),
            server_port: parse_var("PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Rate gate interval as a `Duration`.
    ///
    /// Values too large for a `Duration` saturate rather than disabling the
    /// gate.
    pub fn rate_interval(&self) -> Duration {
        if self.rate_limit_interval.is_nan() || self.rate_limit_interval <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.rate_limit_interval).unwrap_or(Duration::MAX)
    }

    /// Per-attempt HTTP timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout).unwrap_or(Duration::from_secs(6))
    }

    /// Capacity bound for the cache, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            rate_limit_interval: 1.0,
            max_entries: 256,
            cleanup_interval: 60,
            request_timeout: 6.0,
            max_retries: 3,
            server_port: 8000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
