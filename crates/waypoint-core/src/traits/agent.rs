// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote agent trait used by the relay's background delegation.

use async_trait::async_trait;

use crate::traits::adapter::ServiceAdapter;
use crate::types::AgentInvocationResult;

/// Forwards one user message to the reasoning agent.
///
/// Implementations never fail: transport and decode problems are folded into
/// an error-flavored [`AgentInvocationResult`].
#[async_trait]
pub trait AgentInvoker: ServiceAdapter {
    async fn invoke(&self, message: &str) -> AgentInvocationResult;
}
