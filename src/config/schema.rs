//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! framework. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Session cookie and lifetime settings.
    pub session: SessionConfig,

    /// CORS rules, evaluated in declared order (last match wins).
    pub cors: Vec<CorsRuleConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Diagnostic settings for development deployments.
    pub diagnostics: DiagnosticsConfig,
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
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Session cookie and lifetime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session-identifying cookie.
    pub cookie_name: String,

    /// Session time-to-live in seconds, refreshed on every store write.
    pub ttl_secs: u64,

    /// Interval between background sweeps of expired sessions.
    /// Zero disables the sweeper; expiry is still enforced lazily on reads.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            ttl_secs: 60 * 60 * 24 * 30,
            sweep_interval_secs: 300,
        }
    }
}

/// One CORS rule. Paths are matched against `url_regex` anchored at the
/// start; omitted fields fall back to the matcher's defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsRuleConfig {
    /// Pattern matched against the request path.
    pub url_regex: String,

    /// Origins for `Access-Control-Allow-Origin`, joined by spaces.
    #[serde(default)]
    pub allow_origin: Vec<String>,

    /// Value of `Access-Control-Allow-Credentials`.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Methods permitted for matching paths, in declared order.
    #[serde(default)]
    pub allow_methods: Option<Vec<String>>,

    /// Headers permitted for matching paths.
    #[serde(default)]
    pub allow_headers: Option<Vec<String>>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request bound enforced at the transport layer.
    pub request_secs: u64,

    /// Bound on a single handler invocation; a hung handler must not
    /// starve the worker.
    pub handler_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            handler_secs: 30,
        }
    }
}

/// Diagnostic settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Include internal error detail in 500 responses. Never enable in
    /// production.
    pub expose_internal_errors: bool,
}
