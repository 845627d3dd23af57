// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote reasoning agent.
//!
//! Provides [`RemoteAgentClient`], which posts the raw user message, retries
//! transient failures once, and folds every failure into an error-flavored
//! [`AgentInvocationResult`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, error, instrument, warn};

use waypoint_config::model::AgentConfig;
use waypoint_core::{AgentInvocationResult, AgentInvoker, HealthStatus, RelayError, ServiceAdapter};

use crate::reply::{AgentReply, interpret_body};

/// Error text for any transport failure (connect, timeout, body read).
pub const CONNECT_ERROR: &str = "Could not connect to the main agent";

/// Error text when no endpoint is configured.
pub const URL_MISSING_ERROR: &str = "Main agent URL not configured";

/// Client for the agent endpoint, sharing one connection pool per process.
#[derive(Debug, Clone)]
pub struct RemoteAgentClient {
    client: reqwest::Client,
    url: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl RemoteAgentClient {
    /// Build a client from the `[agent]` configuration section.
    pub fn new(config: &AgentConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Delegation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: config
                .url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sends one message and returns the normalized reply.
    ///
    /// Transport failures and transient statuses (429, 500, 502, 503, 504)
    /// are retried up to `max_retries` times after `retry_backoff`.
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn send(&self, message: &str) -> AgentInvocationResult {
        let Some(url) = self.url.as_deref() else {
            error!("agent url is not configured");
            return AgentInvocationResult::failure(URL_MISSING_ERROR);
        };

        for attempt in 0..=self.max_retries {
            let retries_left = attempt < self.max_retries;
            if attempt > 0 {
                warn!(attempt, "retrying agent request");
                tokio::time::sleep(self.retry_backoff).await;
            }

            let response = match self
                .client
                .post(url)
                .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
                .body(message.to_owned())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, timeout = e.is_timeout(), "agent request failed");
                    if retries_left {
                        continue;
                    }
                    return AgentInvocationResult::failure(CONNECT_ERROR);
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "agent response received");

            if is_transient_error(status) && retries_left {
                warn!(status = %status, "transient agent error, will retry");
                continue;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(attempt, error = %e, "failed to read agent response body");
                    if retries_left {
                        continue;
                    }
                    return AgentInvocationResult::failure(CONNECT_ERROR);
                }
            };

            if status.is_success() {
                return interpret_body(&body);
            }

            let message = serde_json::from_str::<AgentReply>(&body)
                .ok()
                .and_then(|reply| reply.error)
                .unwrap_or_else(|| format!("agent returned HTTP {}", status.as_u16()));
            error!(status = %status, error = %message, "agent request rejected");
            return AgentInvocationResult::failure(message);
        }

        AgentInvocationResult::failure(CONNECT_ERROR)
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[async_trait]
impl ServiceAdapter for RemoteAgentClient {
    fn name(&self) -> &str {
        "remote-agent"
    }

    /// Reports configuration only; the agent is not contacted.
    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(match &self.url {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy(URL_MISSING_ERROR.to_string()),
        })
    }
}

#[async_trait]
impl AgentInvoker for RemoteAgentClient {
    async fn invoke(&self, message: &str) -> AgentInvocationResult {
        self.send(message).await
    }
}
