// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-path store trait for the shared real-time database.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RelayError;
use crate::traits::adapter::ServiceAdapter;

/// A JSON tree addressed by slash-separated paths.
///
/// Paths never start or end with `/`. Writing `null` removes a node, and a
/// node that becomes empty disappears, matching the real-time database.
#[async_trait]
pub trait RealtimeStore: ServiceAdapter {
    /// Reads the subtree at `path`; `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, RelayError>;

    /// Replaces the subtree at `path`.
    async fn set(&self, path: &str, value: Value) -> Result<(), RelayError>;

    /// Applies a multi-path update atomically.
    ///
    /// Every key of `fields` is a path relative to `path`; either all of them
    /// are written or none are.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RelayError>;

    /// Removes the subtree at `path`.
    async fn delete(&self, path: &str) -> Result<(), RelayError> {
        self.set(path, Value::Null).await
    }
}
