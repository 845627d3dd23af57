// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bookkeeping for detached delegations.
//!
//! Every delegation runs on a [`TaskTracker`] so shutdown can wait for
//! in-flight work, and leaves a [`DelegationRecord`] describing how it ended.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, EnumString};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use waypoint_core::ConversationKey;

/// Lifecycle of one delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DelegationStatus {
    /// The agent call or reply write is in progress.
    Running,
    /// The agent's answer was written and typing cleared.
    Replied,
    /// An apology carrying the agent's error was written and typing cleared.
    ErrorReplied,
    /// No reply could be written; typing was still cleared.
    ReplyFailed,
    /// Neither the reply nor the typing clear landed.
    TypingStuck,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelegationRecord {
    pub id: String,
    pub user_id: String,
    pub itinerary_id: String,
    pub status: DelegationStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Task handles and terminal statuses for background delegations.
pub struct DelegationTracker {
    tasks: TaskTracker,
    records: DashMap<String, DelegationRecord>,
    finished: Mutex<VecDeque<String>>,
    history_limit: usize,
}

impl DelegationTracker {
    /// Keep at most `history_limit` finished records; running ones are never evicted.
    pub fn new(history_limit: usize) -> Self {
        Self {
            tasks: TaskTracker::new(),
            records: DashMap::new(),
            finished: Mutex::new(VecDeque::new()),
            history_limit: history_limit.max(1),
        }
    }

    /// Register a new running delegation and return its id.
    pub fn begin(&self, key: &ConversationKey) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.insert(
            id.clone(),
            DelegationRecord {
                id: id.clone(),
                user_id: key.user_id().to_string(),
                itinerary_id: key.itinerary_id().to_string(),
                status: DelegationStatus::Running,
                started_at: Utc::now(),
                finished_at: None,
                error: None,
            },
        );
        id
    }

    /// Run `task` detached; it is awaited only by [`drain`](Self::drain).
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Record how a delegation ended.
    pub fn finish(&self, id: &str, status: DelegationStatus, error: Option<String>) {
        if let Some(mut record) = self.records.get_mut(id) {
            record.status = status;
            record.finished_at = Some(Utc::now());
            record.error = error;
        } else {
            warn!(delegation_id = id, "finishing unknown delegation");
            return;
        }
        debug!(delegation_id = id, status = %status, "delegation finished");

        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        finished.push_back(id.to_string());
        while finished.len() > self.history_limit {
            if let Some(evicted) = finished.pop_front() {
                self.records.remove(&evicted);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<DelegationRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// All known records, newest first.
    pub fn snapshot(&self) -> Vec<DelegationRecord> {
        let mut records: Vec<DelegationRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    /// Number of known records per status.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter() {
            *counts.entry(record.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Delegations whose typing flag may still read `true`.
    pub fn stuck(&self) -> Vec<DelegationRecord> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.status == DelegationStatus::TypingStuck)
            .collect()
    }

    /// Delegations whose tasks have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting work and wait up to `timeout` for running delegations.
    ///
    /// Returns `true` when everything finished in time. Nothing is cancelled.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending == 0 {
            info!("no delegations to drain");
            return true;
        }

        info!(count = pending, "waiting for delegations to complete");
        match tokio::time::timeout(timeout, self.tasks.wait()).await {
            Ok(()) => {
                info!("all delegations drained");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.tasks.len(),
                    "drain timeout reached, exiting with delegations in flight"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ConversationKey {
        ConversationKey::new("u", "i").unwrap()
    }

    #[test]
    fn begin_then_finish_updates_record() {
        let tracker = DelegationTracker::new(8);
        let id = tracker.begin(&key());
        assert_eq!(tracker.get(&id).unwrap().status, DelegationStatus::Running);

        tracker.finish(&id, DelegationStatus::ErrorReplied, Some("timeout".into()));
        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, DelegationStatus::ErrorReplied);
        assert!(record.finished_at.is_some());
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn history_limit_evicts_oldest_finished() {
        let tracker = DelegationTracker::new(2);
        let ids: Vec<String> = (0..3).map(|_| tracker.begin(&key())).collect();
        let running = tracker.begin(&key());
        for id in &ids {
            tracker.finish(id, DelegationStatus::Replied, None);
        }
        assert!(tracker.get(&ids[0]).is_none());
        assert!(tracker.get(&ids[1]).is_some());
        assert!(tracker.get(&ids[2]).is_some());
        assert!(tracker.get(&running).is_some());
    }

    #[test]
    fn counts_and_stuck() {
        let tracker = DelegationTracker::new(8);
        let a = tracker.begin(&key());
        let b = tracker.begin(&key());
        let _c = tracker.begin(&key());
        tracker.finish(&a, DelegationStatus::Replied, None);
        tracker.finish(&b, DelegationStatus::TypingStuck, Some("offline".into()));

        let counts = tracker.counts();
        assert_eq!(counts["replied"], 1);
        assert_eq!(counts["typing_stuck"], 1);
        assert_eq!(counts["running"], 1);
        let stuck = tracker.stuck();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, b);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(DelegationStatus::ReplyFailed.to_string(), "reply_failed");
        assert_eq!(
            "error_replied".parse::<DelegationStatus>().unwrap(),
            DelegationStatus::ErrorReplied
        );
        let json = serde_json::to_value(DelegationStatus::TypingStuck).unwrap();
        assert_eq!(json, "typing_stuck");
    }

    #[tokio::test]
    async fn drain_waits_for_spawned_tasks() {
        let tracker = DelegationTracker::new(8);
        let (tx, rx) = tokio::sync::oneshot::channel();
        tracker.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });
        assert_eq!(tracker.in_flight(), 1);
        assert!(tracker.drain(Duration::from_secs(5)).await);
        assert!(rx.await.is_ok());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_times_out_without_cancelling() {
        let tracker = DelegationTracker::new(8);
        tracker.spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        assert!(!tracker.drain(Duration::from_millis(10)).await);
        assert_eq!(tracker.in_flight(), 1);
    }

    #[tokio::test]
    async fn drain_with_nothing_running_is_immediate() {
        let tracker = DelegationTracker::new(8);
        assert!(tracker.drain(Duration::from_millis(1)).await);
    }
}
