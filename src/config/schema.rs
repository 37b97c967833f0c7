//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the zipper.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::observability::logging::LoggingConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZipperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-group concurrency ceiling.
    pub limiter: LimiterConfig,

    /// Value sent in the `Accept` header to every backend.
    pub encoding: String,

    /// Backend group definitions.
    pub groups: Vec<GroupConfig>,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ZipperConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            limiter: LimiterConfig::default(),
            encoding: "application/x-protobuf".to_string(),
            groups: Vec::new(),
            logging: LoggingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A named set of interchangeable replicas.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    /// Group identifier used in URLs, logs and limiter keys.
    pub name: String,

    /// Replica base URLs (e.g., "http://10.0.0.1:8080"), tried in order.
    pub servers: Vec<String>,

    /// Minimum number of tries per query (raised to the replica count).
    #[serde(default = "default_max_tries")]
    pub max_tries: usize,
}

fn default_max_tries() -> usize {
    1
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for a whole dispatch call (every try) in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 1,
            request_secs: 10,
            idle_secs: 60,
        }
    }
}

/// Concurrency limiter configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Slots per group. 0 disables the ceiling.
    pub max_concurrent_per_group: usize,

    /// Per-group slot counts that replace the default.
    pub overrides: Vec<LimiterOverride>,
}

/// Slot count for a single group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterOverride {
    pub group: String,
    pub capacity: usize,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
