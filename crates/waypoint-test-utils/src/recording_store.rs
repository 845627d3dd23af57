// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper that records every write and can inject failures.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use waypoint_core::types::TYPING_KEY;
use waypoint_core::{ConversationKey, HealthStatus, RealtimeStore, RelayError, ServiceAdapter};
use waypoint_store::MemoryStore;

/// One write that reached the store, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Set { path: String, value: Value },
    Update { path: String, fields: Map<String, Value> },
}

impl StoreWrite {
    /// Every absolute path this write touched, with its value.
    pub fn touched(&self) -> Vec<(String, Value)> {
        match self {
            Self::Set { path, value } => vec![(path.clone(), value.clone())],
            Self::Update { path, fields } => fields
                .iter()
                .map(|(rel, v)| (format!("{path}/{rel}"), v.clone()))
                .collect(),
        }
    }
}

/// A [`MemoryStore`] that keeps a write log and fails writes on demand.
///
/// Failing writes are logged too, so tests can see what was attempted.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<StoreWrite>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write whose path (or any updated path) contains `fragment`.
    pub fn fail_writes_containing(&self, fragment: &str) {
        lock(&self.failing).push(fragment.to_string());
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        lock(&self.failing).clear();
    }

    /// All attempted writes, in order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        lock(&self.writes).clone()
    }

    /// Values written to a conversation's typing flag, in order.
    pub fn typing_history(&self, key: &ConversationKey) -> Vec<bool> {
        let typing = key.typing_path();
        self.writes()
            .iter()
            .flat_map(StoreWrite::touched)
            .filter(|(path, _)| *path == typing)
            .filter_map(|(_, v)| v.as_bool())
            .collect()
    }

    /// Every absolute path written so far.
    pub fn written_paths(&self) -> Vec<String> {
        self.writes()
            .iter()
            .flat_map(StoreWrite::touched)
            .map(|(path, _)| path)
            .collect()
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, write: &StoreWrite) -> Result<(), RelayError> {
        lock(&self.writes).push(write.clone());
        let failing = lock(&self.failing);
        for (path, _) in write.touched() {
            if let Some(fragment) = failing.iter().find(|f| path.contains(f.as_str())) {
                return Err(RelayError::persistence(
                    path,
                    format!("injected failure for `{fragment}`"),
                ));
            }
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ServiceAdapter for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        if lock(&self.failing).is_empty() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("failure injection active".into()))
        }
    }
}

#[async_trait]
impl RealtimeStore for RecordingStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RelayError> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RelayError> {
        self.check(&StoreWrite::Set {
            path: path.to_string(),
            value: value.clone(),
        })?;
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RelayError> {
        self.check(&StoreWrite::Update {
            path: path.to_string(),
            fields: fields.clone(),
        })?;
        self.inner.update(path, fields).await
    }
}

/// Whether `fields` clears the typing flag, as a reply update does.
pub fn clears_typing(fields: &Map<String, Value>) -> bool {
    fields.get(TYPING_KEY) == Some(&Value::Bool(false))
}
