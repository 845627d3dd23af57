// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process JSON tree implementing [`RealtimeStore`].
//!
//! Selected with `database.url = "memory://"` for local development and used
//! throughout the test suites. Mirrors the real-time database's observable
//! rules: writing `null` removes a node and empty parents disappear.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use waypoint_core::{HealthStatus, RealtimeStore, RelayError, ServiceAdapter};

/// A single JSON document guarded by a mutex.
///
/// The lock is never held across an await point; every operation completes
/// synchronously, so multi-path updates are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: Mutex<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole tree, for assertions and diagnostics.
    pub fn snapshot(&self) -> Result<Value, RelayError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Value>, RelayError> {
        self.root
            .lock()
            .map_err(|_| RelayError::Internal("memory store lock poisoned".to_string()))
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn lookup<'a>(root: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    segs.iter().try_fold(root, |node, seg| match node {
        Value::Object(map) => map.get(*seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `segs`, creating intermediate objects and replacing
/// scalars that sit in the way.
fn write(root: &mut Value, segs: &[&str], value: Value) {
    if is_empty(&value) {
        remove(root, segs);
        return;
    }
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };
    let mut node = root;
    for seg in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else { return };
        node = map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

/// Remove the node at `segs` and prune parents left empty.
fn remove(root: &mut Value, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else {
        *root = Value::Null;
        return;
    };
    let Value::Object(map) = root else { return };
    if rest.is_empty() {
        map.remove(*first);
    } else if let Some(child) = map.get_mut(*first) {
        remove(child, rest);
        if is_empty(child) {
            map.remove(*first);
        }
    }
    if map.is_empty() {
        *root = Value::Null;
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl ServiceAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        drop(self.lock()?);
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RelayError> {
        let root = self.lock()?;
        Ok(lookup(&root, &segments(path))
            .filter(|v| !v.is_null())
            .cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RelayError> {
        let mut root = self.lock()?;
        write(&mut root, &segments(path), value);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RelayError> {
        let base = segments(path);
        let mut root = self.lock()?;
        for (relative, value) in fields {
            let mut segs = base.clone();
            segs.extend(segments(&relative));
            write(&mut root, &segs, value);
        }
        Ok(())
    }
}
