// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waypoint relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// URL scheme selecting the in-process store instead of a remote database.
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// Top-level Waypoint configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. The database and agent URLs have no defaults and must be
/// provided before the server will start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaypointConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Real-time database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remote reasoning agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Background delegation bookkeeping.
    #[serde(default)]
    pub delegation: DelegationConfig,

    /// Itinerary state settings.
    #[serde(default)]
    pub itinerary: ItineraryConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token guarding the itinerary tool routes. `None` disables them.
    #[serde(default)]
    pub tool_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tool_token", &self.tool_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tool_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8014
}

/// Real-time database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database root URL (`https://<instance>.firebaseio.com`) or `memory://`.
    #[serde(default)]
    pub url: Option<String>,

    /// Path to the service-account JSON key file.
    #[serde(default)]
    pub credentials_path: Option<String>,

    /// Timeout for a single database request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Whether the configured URL selects the in-process store.
    pub fn is_memory(&self) -> bool {
        self.url.as_deref() == Some(MEMORY_DATABASE_URL)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            credentials_path: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Remote agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Endpoint receiving the raw user message.
    #[serde(default)]
    pub url: Option<String>,

    /// Timeout for a single attempt.
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a transport failure or transient status.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_agent_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_agent_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Background delegation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationConfig {
    /// How long shutdown waits for in-flight delegations.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Finished delegation records kept for inspection.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: default_drain_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_drain_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    256
}

/// Itinerary state configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ItineraryConfig {
    /// Pre-created plan used to seed conversations with no stored state.
    #[serde(default)]
    pub seed_plan_path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
