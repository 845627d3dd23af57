// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by the store and agent adapters.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::HealthStatus;

/// Identity and health reporting for an injected service client.
#[async_trait]
pub trait ServiceAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, RelayError>;
}
