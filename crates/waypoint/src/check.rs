// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `waypoint check` command implementation.
//!
//! Runs quick checks against an already-validated configuration and reports
//! whether `waypoint serve` would start.

use std::time::{Duration, Instant};

use waypoint_agent::RemoteAgentClient;
use waypoint_config::model::WaypointConfig;
use waypoint_core::{HealthStatus, RelayError, ServiceAdapter};

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs the `waypoint check` command.
///
/// Fails when any check fails; warnings are reported but do not fail.
pub async fn run_check(config: &WaypointConfig) -> Result<(), RelayError> {
    let results = vec![
        check_config(config),
        check_database(config).await,
        check_agent(config).await,
        check_seed_plan(config).await,
    ];

    println!();
    println!("  waypoint check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    if failed > 0 {
        let word = if failed == 1 { "check" } else { "checks" };
        return Err(RelayError::Config(format!("{failed} {word} failed")));
    }
    println!("  All checks passed.");
    println!();
    Ok(())
}

fn render_line(result: &CheckResult) -> String {
    let tag = match result.status {
        CheckStatus::Pass => "[OK]  ",
        CheckStatus::Warn => "[WARN]",
        CheckStatus::Fail => "[FAIL]",
    };
    format!(
        "    {tag} {:<16} {} ({}ms)",
        result.name,
        result.message,
        result.duration.as_millis()
    )
}

fn check_config(config: &WaypointConfig) -> CheckResult {
    let start = Instant::now();
    let tools = if config.server.tool_token.is_some() {
        "tool routes enabled"
    } else {
        "tool routes disabled"
    };
    CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        format!(
            "valid (listening on {}:{}, {tools})",
            config.server.host, config.server.port
        ),
        start,
    )
}

async fn check_database(config: &WaypointConfig) -> CheckResult {
    let start = Instant::now();
    let store = match waypoint_store::open_store(&config.database).await {
        Ok(store) => store,
        Err(e) => return CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
    };

    match store.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Database", CheckStatus::Pass, store.name(), start)
        }
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Database", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Database", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_agent(config: &WaypointConfig) -> CheckResult {
    let start = Instant::now();
    let client = match RemoteAgentClient::new(&config.agent) {
        Ok(client) => client,
        Err(e) => return CheckResult::new("Agent", CheckStatus::Fail, e.to_string(), start),
    };
    match client.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Agent",
            CheckStatus::Pass,
            format!("configured ({})", client.url().unwrap_or_default()),
            start,
        ),
        Ok(status) => CheckResult::new("Agent", CheckStatus::Fail, status.to_string(), start),
        Err(e) => CheckResult::new("Agent", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_seed_plan(config: &WaypointConfig) -> CheckResult {
    let start = Instant::now();
    let Some(path) = &config.itinerary.seed_plan_path else {
        return CheckResult::new("Seed plan", CheckStatus::Pass, "none configured", start);
    };
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => CheckResult::new("Seed plan", CheckStatus::Pass, path.as_str(), start),
        Ok(_) => CheckResult::new(
            "Seed plan",
            CheckStatus::Warn,
            format!("{path} is not a file (empty itineraries will be used)"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Seed plan",
            CheckStatus::Warn,
            format!("{path}: {e} (empty itineraries will be used)"),
            start,
        ),
    }
}
