// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Waypoint chat relay.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides (including the
//! variable names older deployments used), and diagnostic error rendering
//! with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use waypoint_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on port {}", config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str, load_dotenv};
pub use model::WaypointConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `WaypointConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<WaypointConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from an explicit file (plus environment) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<WaypointConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(absolute_display(path), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<WaypointConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let candidates = [
        Some(Path::new(loader::LOCAL_CONFIG_PATH).to_path_buf()),
        loader::user_config_path(),
        Some(Path::new(loader::SYSTEM_CONFIG_PATH).to_path_buf()),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (absolute_display(&path), content))
        })
        .collect()
}

/// Figment records file sources by absolute path.
fn absolute_display(path: &Path) -> String {
    if path.is_absolute() {
        return path.display().to_string();
    }
    std::env::current_dir()
        .map(|d| d.join(path).display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}
