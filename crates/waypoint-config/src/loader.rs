// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./waypoint.toml` > `~/.config/waypoint/waypoint.toml`
//! > `/etc/waypoint/waypoint.toml`, with the deployment's historical
//! environment variables and `WAYPOINT_`-prefixed overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WaypointConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/waypoint/waypoint.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "waypoint.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waypoint/waypoint.toml` (system-wide)
/// 3. `~/.config/waypoint/waypoint.toml` (user XDG config)
/// 4. `./waypoint.toml` (local directory)
/// 5. Legacy variables (`FIREBASE_DATABASE_URL`, `PORT`, ...)
/// 6. `WAYPOINT_*` environment variables
pub fn load_config() -> Result<WaypointConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WaypointConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaypointConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaypointConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaypointConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WaypointConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// `~/.config/waypoint/waypoint.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("waypoint/waypoint.toml"))
}

/// Load a `.env` file from the working directory into the process environment.
///
/// Returns the loaded file, or `None` when there is none. Runs before
/// logging is set up, so the caller reports the outcome.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Environment variables used by earlier deployments of the relay.
///
/// `HOST_AGENT_A2A_URL` wins over `MAIN_AGENT_URL` when both are set.
pub fn legacy_env_provider() -> Figment {
    Figment::new()
        .merge(Env::raw().only(&["MAIN_AGENT_URL"]).map(|_| "agent.url".into()))
        .merge(
            Env::raw()
                .only(&[
                    "GOOGLE_APPLICATION_CREDENTIALS",
                    "FIREBASE_DATABASE_URL",
                    "HOST_AGENT_A2A_URL",
                    "PORT",
                ])
                .map(|key| legacy_key(key.as_str()).into()),
        )
}

fn legacy_key(key: &str) -> &'static str {
    match key.to_ascii_lowercase().as_str() {
        "google_application_credentials" => "database.credentials_path",
        "firebase_database_url" => "database.url",
        "host_agent_a2a_url" => "agent.url",
        _ => "server.port",
    }
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `WAYPOINT_DATABASE_CREDENTIALS_PATH`
/// must map to `database.credentials_path`, not `database.credentials.path`.
fn env_provider() -> Env {
    Env::prefixed("WAYPOINT_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["server", "database", "agent", "delegation", "itinerary", "logging"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
