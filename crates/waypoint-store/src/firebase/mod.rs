// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firebase Realtime Database REST implementation of [`RealtimeStore`].
//!
//! Every path maps to `{database_url}/{path}.json`: `GET` reads, `PUT`
//! replaces, `PATCH` applies a multi-path update atomically, and `DELETE`
//! removes.

pub mod auth;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use waypoint_core::{HealthStatus, RealtimeStore, RelayError, ServiceAdapter};

pub use auth::{ServiceAccountKey, TokenSource};

/// REST client for one Firebase Realtime Database instance.
#[derive(Debug)]
pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<TokenSource>,
    request_timeout: Duration,
}

impl FirebaseStore {
    /// Build a store for `database_url` authenticated as `key`.
    pub fn new(
        database_url: &str,
        key: ServiceAccountKey,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(database_url.trim_end_matches('/'))
            .map_err(|e| RelayError::Config(format!("invalid database url `{database_url}`: {e}")))?;
        let tokens = Arc::new(TokenSource::new(key, client.clone())?);
        Ok(Self {
            client,
            base_url,
            tokens,
            request_timeout,
        })
    }

    /// `{base}/{path}.json?access_token=...`, with each segment percent-encoded.
    fn url_for(&self, path: &str, token: &str) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        {
            let mut out = url.path_segments_mut().map_err(|_| {
                RelayError::Config(format!("database url `{}` cannot be a base", self.base_url))
            })?;
            out.pop_if_empty();
            match segs.split_last() {
                None => {
                    out.push(".json");
                }
                Some((last, parents)) => {
                    out.extend(parents);
                    out.push(&format!("{last}.json"));
                }
            }
        }
        url.query_pairs_mut().append_pair("access_token", token);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, RelayError> {
        let token = self.tokens.access_token().await?;
        let url = self.url_for(path, &token)?;

        let mut request = self.client.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(status_error(path, status, &detail));
        }

        response.json::<Value>().await.map_err(|e| RelayError::Decode {
            message: format!("malformed database response for `{path}`: {e}"),
            source: Some(Box::new(e)),
        })
    }

    fn transport_error(&self, path: &str, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            warn!(path, timeout = ?self.request_timeout, "database request timed out");
            return RelayError::Timeout {
                duration: self.request_timeout,
            };
        }
        RelayError::Persistence {
            path: path.to_string(),
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn status_error(path: &str, status: StatusCode, detail: &str) -> RelayError {
    RelayError::persistence(path, format!("HTTP {}: {detail}", status.as_u16()))
}

#[async_trait]
impl ServiceAdapter for FirebaseStore {
    fn name(&self) -> &str {
        "firebase"
    }

    /// Mints a token and performs a shallow read of the root.
    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let token = match self.tokens.access_token().await {
            Ok(token) => token,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        let mut url = self.url_for("", &token)?;
        url.query_pairs_mut().append_pair("shallow", "true");

        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Unhealthy(format!(
                "database returned HTTP {}",
                resp.status().as_u16()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("database unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, path: &str) -> Result<Option<Value>, RelayError> {
        let value = self.send(Method::GET, path, None).await?;
        Ok((!value.is_null()).then_some(value))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, path: &str, value: Value) -> Result<(), RelayError> {
        self.send(Method::PUT, path, Some(value)).await?;
        Ok(())
    }

    #[instrument(skip(self, fields), fields(keys = fields.len()), level = "debug")]
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RelayError> {
        self.send(Method::PATCH, path, Some(Value::Object(fields)))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, path: &str) -> Result<(), RelayError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }
}
