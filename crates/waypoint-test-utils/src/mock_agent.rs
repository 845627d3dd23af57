// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted agent adapter for deterministic testing.
//!
//! `ScriptedAgent` implements `AgentInvoker` with pre-configured outcomes,
//! enabling relay tests without a remote agent process.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use waypoint_core::{AgentInvocationResult, AgentInvoker, HealthStatus, RelayError, ServiceAdapter};

/// What one invocation should do.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Reply(String),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone)]
struct ScriptedStep {
    outcome: ScriptedOutcome,
    delay: Duration,
}

/// An agent that plays back queued outcomes in FIFO order.
///
/// When the queue is empty, a default "mock response" reply is returned.
/// A gated agent additionally blocks every call until [`release`](Self::release)
/// hands out a permit.
pub struct ScriptedAgent {
    steps: Arc<Mutex<VecDeque<ScriptedStep>>>,
    received: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Create an agent pre-loaded with successful replies.
    pub fn with_replies(replies: Vec<&str>) -> Self {
        let steps = replies
            .into_iter()
            .map(|r| ScriptedStep {
                outcome: ScriptedOutcome::Reply(r.to_string()),
                delay: Duration::ZERO,
            })
            .collect();
        Self {
            steps: Arc::new(Mutex::new(steps)),
            ..Self::new()
        }
    }

    /// Create an agent whose calls wait for [`release`](Self::release).
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub async fn push(&self, outcome: ScriptedOutcome) {
        self.push_delayed(outcome, Duration::ZERO).await;
    }

    /// Queue an outcome delivered after `delay`.
    pub async fn push_delayed(&self, outcome: ScriptedOutcome, delay: Duration) {
        self.steps
            .lock()
            .await
            .push_back(ScriptedStep { outcome, delay });
    }

    /// Let `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Messages received so far, in call order.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    async fn next_step(&self) -> ScriptedStep {
        self.steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedStep {
                outcome: ScriptedOutcome::Reply("mock response".to_string()),
                delay: Duration::ZERO,
            })
    }
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAdapter for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted-agent"
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl AgentInvoker for ScriptedAgent {
    async fn invoke(&self, message: &str) -> AgentInvocationResult {
        self.received.lock().await.push(message.to_string());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let step = self.next_step().await;
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        match step.outcome {
            ScriptedOutcome::Reply(text) => AgentInvocationResult::success(text),
            ScriptedOutcome::Fail(error) => AgentInvocationResult::failure(error),
            ScriptedOutcome::Panic(message) => panic!("{message}"),
        }
    }
}
