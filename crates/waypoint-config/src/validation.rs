// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: required connection
//! settings, URL schemes, positive timeouts, and a recognised log level.

use std::path::Path;

use crate::diagnostic::ConfigError;
use crate::model::{MEMORY_DATABASE_URL, WaypointConfig};

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `agent.max_retries`.
const MAX_AGENT_RETRIES: u32 = 5;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// every problem found (does not fail fast).
pub fn validate_config(config: &WaypointConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_server(config, &mut errors);
    validate_database(config, &mut errors);
    validate_agent(config, &mut errors);

    if config.delegation.history_limit == 0 {
        errors.push(validation("delegation.history_limit must be greater than 0"));
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(config: &WaypointConfig, errors: &mut Vec<ConfigError>) {
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(validation("server.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.server.port == 0 {
        errors.push(validation("server.port must not be 0"));
    }

    if let Some(token) = &config.server.tool_token {
        if token.trim().is_empty() {
            errors.push(validation(
                "server.tool_token must not be empty when set; remove it to disable the tool routes",
            ));
        }
    }
}

fn validate_database(config: &WaypointConfig, errors: &mut Vec<ConfigError>) {
    let db = &config.database;

    match db.url.as_deref().map(str::trim) {
        None | Some("") => errors.push(ConfigError::MissingKey {
            key: "database.url".to_string(),
            hint: "set FIREBASE_DATABASE_URL or add `url = <value>` under [database] in waypoint.toml"
                .to_string(),
        }),
        Some(MEMORY_DATABASE_URL) => {}
        Some(url) if !is_http_url(url) => errors.push(validation(format!(
            "database.url `{url}` must start with http://, https://, or be `{MEMORY_DATABASE_URL}`"
        ))),
        Some(_) => {}
    }

    if !db.is_memory() {
        match db.credentials_path.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigError::MissingKey {
                key: "database.credentials_path".to_string(),
                hint: "set GOOGLE_APPLICATION_CREDENTIALS or add `credentials_path = <value>` under [database] in waypoint.toml"
                    .to_string(),
            }),
            Some(path) if !Path::new(path).is_file() => errors.push(validation(format!(
                "database.credentials_path `{path}` does not point to a readable file"
            ))),
            Some(_) => {}
        }
    }

    if db.request_timeout_secs == 0 {
        errors.push(validation("database.request_timeout_secs must be greater than 0"));
    }
}

fn validate_agent(config: &WaypointConfig, errors: &mut Vec<ConfigError>) {
    let agent = &config.agent;

    match agent.url.as_deref().map(str::trim) {
        None | Some("") => errors.push(ConfigError::MissingKey {
            key: "agent.url".to_string(),
            hint: "set HOST_AGENT_A2A_URL or add `url = <value>` under [agent] in waypoint.toml"
                .to_string(),
        }),
        Some(url) if !is_http_url(url) => errors.push(validation(format!(
            "agent.url `{url}` must start with http:// or https://"
        ))),
        Some(_) => {}
    }

    if agent.timeout_secs == 0 {
        errors.push(validation("agent.timeout_secs must be greater than 0"));
    }

    if agent.max_retries > MAX_AGENT_RETRIES {
        errors.push(validation(format!(
            "agent.max_retries must be at most {MAX_AGENT_RETRIES}, got {}",
            agent.max_retries
        )));
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
